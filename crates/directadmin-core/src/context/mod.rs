// Privilege-scoped session contexts
//
// Three layers over one `Connection`: `UserContext` for operations on
// the acting account, `ResellerContext` adding management of subordinate
// users, `AdminContext` adding server-wide account and IP management.
// Each higher layer derefs to the one below, so the operation set is a
// strict superset as privilege rises.

mod admin;
mod reseller;
mod user;

pub use admin::AdminContext;
pub use reseller::{PasswordTargets, ResellerContext, SuspensionReason};
pub use user::UserContext;
