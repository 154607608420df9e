pub mod device_binding_repository;
pub mod token_record_repository;
pub mod user_account_repository;
pub mod user_session_repository;

pub use device_binding_repository::PostgresDeviceBindingRepository;
pub use token_record_repository::PostgresTokenRecordRepository;
pub use user_account_repository::PostgresUserAccountRepository;
pub use user_session_repository::PostgresUserSessionRepository;
