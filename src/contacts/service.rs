use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::contacts::repository as contact_repo;
use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::deals::repository as deal_repo;
use crate::shared::models::Contact;
use crate::shared::state::AppState;

#[derive(Debug)]
pub struct NewContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default)]
pub struct ContactChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || name.len() > 255 {
        return Err(AppError::validation_field(
            "Name must be between 1 and 255 characters",
            "name",
        ));
    }
    Ok(())
}

pub fn create_contact(
    state: &AppState,
    ctx: &OrgContext,
    input: NewContact,
) -> Result<Contact, AppError> {
    validate_name(&input.name)?;

    let mut conn = state.conn.get()?;
    conn.transaction::<Contact, AppError, _>(|conn| {
        if let Some(email) = &input.email {
            if contact_repo::email_exists_in_org(conn, ctx.organization_id, email, None)? {
                return Err(AppError::conflict(format!(
                    "Contact with email '{email}' already exists in this organization"
                )));
            }
        }

        let contact = Contact {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            owner_id: ctx.user.id,
            name: input.name,
            email: input.email,
            phone: input.phone,
            created_at: Utc::now(),
        };
        contact_repo::insert(conn, &contact)?;
        Ok(contact)
    })
}

pub fn update_contact(
    state: &AppState,
    ctx: &OrgContext,
    contact_id: Uuid,
    changes: ContactChanges,
) -> Result<Contact, AppError> {
    if let Some(name) = &changes.name {
        validate_name(name)?;
    }

    let mut conn = state.conn.get()?;
    conn.transaction::<Contact, AppError, _>(|conn| {
        let contact = contact_repo::find_for_org(conn, ctx.organization_id, contact_id)?
            .ok_or_else(|| AppError::not_found("Contact", contact_id))?;

        state
            .policy
            .check_resource_ownership(ctx.user.id, contact.owner_id, ctx.role, "Contact")?;

        let final_name = changes.name.unwrap_or_else(|| contact.name.clone());
        let final_email = match changes.email {
            Some(email) => {
                if Some(&email) != contact.email.as_ref()
                    && contact_repo::email_exists_in_org(
                        conn,
                        ctx.organization_id,
                        &email,
                        Some(contact_id),
                    )?
                {
                    return Err(AppError::conflict(format!(
                        "Contact with email '{email}' already exists in this organization"
                    )));
                }
                Some(email)
            }
            None => contact.email.clone(),
        };
        let final_phone = changes.phone.or_else(|| contact.phone.clone());

        let updated = contact_repo::update_fields(
            conn,
            contact.id,
            &final_name,
            final_email.as_deref(),
            final_phone.as_deref(),
        )?;
        Ok(updated)
    })
}

pub fn delete_contact(
    state: &AppState,
    ctx: &OrgContext,
    contact_id: Uuid,
) -> Result<(), AppError> {
    let mut conn = state.conn.get()?;
    conn.transaction::<(), AppError, _>(|conn| {
        let contact = contact_repo::find_for_org(conn, ctx.organization_id, contact_id)?
            .ok_or_else(|| AppError::not_found("Contact", contact_id))?;

        state
            .policy
            .check_resource_ownership(ctx.user.id, contact.owner_id, ctx.role, "Contact")?;

        // Existence check, not a cascade: a contact referenced by any deal
        // stays put until those deals are gone.
        let referencing = deal_repo::count_by_contact(conn, contact.id)?;
        if referencing > 0 {
            return Err(AppError::conflict(format!(
                "Cannot delete contact with {referencing} referencing deal(s); delete or reassign the deals first"
            )));
        }

        contact_repo::delete(conn, contact.id)?;
        Ok(())
    })
}
