// Domain model built on the object cache: accounts, domains, databases
// and their children, all fetched lazily through an owning connection.

mod account;
mod database;
mod domain;
mod ip;
mod login_key;
mod mail;
mod package;

pub use account::{Account, AccountType, Admin, Reseller, User};
pub use database::{AccessHost, Database, DatabaseUser};
pub use domain::{Catchall, Domain, NewDomain, RedirectType, Subdomain};
pub use ip::Ip;
pub use login_key::LoginKey;
pub use mail::{Forwarder, Mailbox};
pub use package::Package;
