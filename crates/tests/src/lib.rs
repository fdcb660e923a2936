pub mod fixtures;

#[cfg(test)]
mod auth_tests;
#[cfg(test)]
mod registration_tests;
#[cfg(test)]
mod multi_tenancy_tests;
#[cfg(test)]
mod role_tests;
#[cfg(test)]
mod chat_tests;
#[cfg(test)]
mod company_admin_tests;
