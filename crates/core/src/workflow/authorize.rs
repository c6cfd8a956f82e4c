use crate::domain::initiative::Initiative;
use crate::domain::user::Actor;
use crate::errors::WorkflowError;
use crate::workflow::stages;

/// Whether `actor` may decide the given stage of `initiative`.
///
/// The role must equal the stage's required role. The corporate role (CTSD)
/// then acts across all sites; every other role must belong to the
/// initiative's site. A missing site on either side denies.
pub fn can_act(actor: &Actor, initiative: &Initiative, step: u8) -> Result<bool, WorkflowError> {
    let stage = stages::stage_at(step)?;

    if actor.role != stage.required_role {
        return Ok(false);
    }
    if actor.role.is_corporate() {
        return Ok(true);
    }

    let (Some(actor_site), Some(initiative_site)) = (actor.site.as_deref(), initiative.site_code())
    else {
        return Ok(false);
    };
    Ok(site_key(actor_site) == site_key(initiative_site))
}

fn site_key(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
