// directadmin-core: privilege contexts, cached objects and the domain
// model on top of the raw directadmin-api client.

pub mod cache;
pub mod context;
pub mod convert;
pub mod error;
pub mod model;

pub use cache::{CacheSlot, ObjectCache};
pub use context::{AdminContext, PasswordTargets, ResellerContext, SuspensionReason, UserContext};
pub use error::Error;
pub use model::{
    AccessHost, Account, AccountType, Admin, Catchall, Database, DatabaseUser, Domain, Forwarder,
    Ip, LoginKey, Mailbox, NewDomain, Package, RedirectType, Reseller, Subdomain, User,
};
