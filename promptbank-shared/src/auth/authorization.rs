/// Authorization rules
///
/// Every permission is a pure function of the actor and, for prompt-level
/// checks, a [`PromptAccess`] view of the prompt. Nothing here touches the
/// database; services load the prompt and its collaborator grants first.
///
/// # Permission Model
///
/// | Check | Allowed |
/// |-------|---------|
/// | view | admin, owner, any user for TEAM prompts, collaborators |
/// | edit | admin, owner, collaborators with EDIT |
/// | delete | admin, owner |
/// | create prompts | admin, editor |
/// | manage categories | admin, editor |
/// | manage users | admin |
///
/// The `require_*` wrappers turn a denial into an [`AuthzError`] whose message
/// is safe to show to the user.
///
/// # Example
///
/// ```
/// use promptbank_shared::auth::authorization::{can_edit, can_view, Actor, PromptAccess};
/// use promptbank_shared::models::prompt::PromptVisibility;
/// use promptbank_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let viewer = Actor::new(Uuid::new_v4(), UserRole::Viewer);
/// let prompt = PromptAccess::new(Some(Uuid::new_v4()), PromptVisibility::Team, &[]);
///
/// assert!(can_view(&viewer, &prompt));
/// assert!(!can_edit(&viewer, &prompt));
/// ```

use uuid::Uuid;

use crate::models::collaborator::CollaboratorGrant;
use crate::models::prompt::{Prompt, PromptVisibility};
use crate::models::user::UserRole;

/// The user a check is made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// The parts of a prompt that decide access
#[derive(Debug, Clone, Copy)]
pub struct PromptAccess<'a> {
    pub owner_id: Option<Uuid>,
    pub visibility: PromptVisibility,
    pub collaborators: &'a [CollaboratorGrant],
}

impl<'a> PromptAccess<'a> {
    pub fn new(
        owner_id: Option<Uuid>,
        visibility: PromptVisibility,
        collaborators: &'a [CollaboratorGrant],
    ) -> Self {
        Self {
            owner_id,
            visibility,
            collaborators,
        }
    }

    pub fn of(prompt: &Prompt, collaborators: &'a [CollaboratorGrant]) -> Self {
        Self::new(prompt.owner_id, prompt.visibility, collaborators)
    }

    fn is_owner(&self, actor: &Actor) -> bool {
        self.owner_id == Some(actor.id)
    }

    fn grant_for(&self, actor: &Actor) -> Option<&CollaboratorGrant> {
        self.collaborators.iter().find(|grant| grant.user_id == actor.id)
    }
}

pub fn can_view(actor: &Actor, prompt: &PromptAccess<'_>) -> bool {
    actor.is_admin()
        || prompt.is_owner(actor)
        || prompt.visibility == PromptVisibility::Team
        || prompt.grant_for(actor).is_some()
}

pub fn can_edit(actor: &Actor, prompt: &PromptAccess<'_>) -> bool {
    actor.is_admin()
        || prompt.is_owner(actor)
        || prompt.grant_for(actor).is_some_and(|grant| grant.role.can_edit())
}

/// Collaborators never delete, whatever their grant
pub fn can_delete(actor: &Actor, prompt: &PromptAccess<'_>) -> bool {
    actor.is_admin() || prompt.is_owner(actor)
}

pub fn can_create_prompt(role: UserRole) -> bool {
    matches!(role, UserRole::Admin | UserRole::Editor)
}

pub fn can_manage_categories(role: UserRole) -> bool {
    matches!(role, UserRole::Admin | UserRole::Editor)
}

pub fn can_manage_users(role: UserRole) -> bool {
    role == UserRole::Admin
}

/// A denied permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("You do not have permission to create prompts.")]
    CreatePrompts,

    #[error("You do not have permission to update this prompt.")]
    UpdatePrompt,

    #[error("You do not have permission to delete this prompt.")]
    DeletePrompt,

    #[error("You do not have permission to duplicate prompts.")]
    DuplicatePrompts,

    #[error("You do not have permission to duplicate this prompt.")]
    DuplicatePrompt,

    #[error("You do not have permission to restore this version.")]
    RestoreVersion,

    #[error("You do not have permission to manage categories.")]
    ManageCategories,

    #[error("Only admins can manage users.")]
    ManageUsers,
}

pub fn require_create_prompt(actor: &Actor) -> Result<(), AuthzError> {
    can_create_prompt(actor.role)
        .then_some(())
        .ok_or(AuthzError::CreatePrompts)
}

pub fn require_manage_categories(actor: &Actor) -> Result<(), AuthzError> {
    can_manage_categories(actor.role)
        .then_some(())
        .ok_or(AuthzError::ManageCategories)
}

pub fn require_manage_users(actor: &Actor) -> Result<(), AuthzError> {
    can_manage_users(actor.role)
        .then_some(())
        .ok_or(AuthzError::ManageUsers)
}

/// Checks `can_view`, failing with `denied`
pub fn require_view(actor: &Actor, prompt: &PromptAccess<'_>, denied: AuthzError) -> Result<(), AuthzError> {
    can_view(actor, prompt).then_some(()).ok_or(denied)
}

/// Checks `can_edit`, failing with `denied`
pub fn require_edit(actor: &Actor, prompt: &PromptAccess<'_>, denied: AuthzError) -> Result<(), AuthzError> {
    can_edit(actor, prompt).then_some(()).ok_or(denied)
}

pub fn require_delete(actor: &Actor, prompt: &PromptAccess<'_>) -> Result<(), AuthzError> {
    can_delete(actor, prompt)
        .then_some(())
        .ok_or(AuthzError::DeletePrompt)
}
