mod credential_verifier;
mod device_binding_registry;
mod orchestrator;
mod token_service;

pub use credential_verifier::CredentialVerifier;
pub use device_binding_registry::DeviceBindingRegistry;
pub use orchestrator::{
    AuthOrchestrator, AuthenticatedRequest, IssuedSession, LoginRequest,
    LoginResponse, LogoutOutcome, OrchestratorConfig, SessionValidation,
    TokenRefresh,
};
pub use token_service::{TokenConfig, TokenService};
