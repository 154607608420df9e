mod device_binding;
mod user_account;
mod user_session;

pub use device_binding::{DeviceBinding, NewDeviceBinding};
pub use user_account::{
    AssignmentSnapshot, CompanyAssignment, DivisionAssignment,
    EstateAssignment, UserAccount, VerifiedUser,
};
pub use user_session::{SessionSecurityFlags, UserSession};
