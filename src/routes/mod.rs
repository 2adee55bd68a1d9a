/// Router Module Index
///
/// Organizes the application's routing into security-segregated modules.
/// Access rules are enforced by the centralized authorization policy inside
/// the resolution layer; the split here keeps the two surfaces — the open
/// query endpoint and the admin moderation endpoints — visibly apart.

/// Routes accessible to all clients. The GraphQL endpoint accepts an optional
/// bearer credential; its absence means the operations run anonymously.
pub mod public;

/// Routes restricted to users with the 'admin' role. The role check runs in
/// the resolution layer against the same policy rules as the mutations.
pub mod admin;
