use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::activities::repository as activity_repo;
use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::deals::repository as deal_repo;
use crate::deals::state_machine::DealStateMachine;
use crate::shared::models::{ActivityPayload, Contact, Deal, DealStage, DealStatus};
use crate::shared::schema::{contacts, organizations};
use crate::shared::state::AppState;

#[derive(Debug)]
pub struct NewDeal {
    pub contact_id: Uuid,
    pub title: String,
    pub amount: Option<BigDecimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Default)]
pub struct DealChanges {
    pub title: Option<String>,
    pub amount: Option<BigDecimal>,
    pub currency: Option<String>,
    pub status: Option<DealStatus>,
    pub stage: Option<DealStage>,
}

fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

/// Resolves the currency for a new deal: explicit value, else the
/// organization default, else the configured global default. The result
/// must be on the whitelist either way.
fn resolve_currency(
    conn: &mut PgConnection,
    state: &AppState,
    organization_id: Uuid,
    requested: Option<String>,
) -> Result<String, AppError> {
    let currency = match requested {
        Some(code) => code.to_uppercase(),
        None => {
            let org_default: Option<Option<String>> = organizations::table
                .filter(organizations::id.eq(organization_id))
                .select(organizations::default_currency)
                .first(conn)
                .optional()?;
            org_default
                .flatten()
                .unwrap_or_else(|| state.config.default_currency.clone())
        }
    };
    if !state.config.is_supported_currency(&currency) {
        return Err(AppError::validation_field(
            format!("Currency '{currency}' is not supported"),
            "currency",
        ));
    }
    Ok(currency)
}

pub fn create_deal(state: &AppState, ctx: &OrgContext, input: NewDeal) -> Result<Deal, AppError> {
    if input.title.trim().is_empty() || input.title.len() > 255 {
        return Err(AppError::validation_field(
            "Title must be between 1 and 255 characters",
            "title",
        ));
    }
    let amount = input.amount.unwrap_or_else(zero);
    if amount < zero() {
        return Err(AppError::validation_field(
            "Amount must not be negative",
            "amount",
        ));
    }

    let mut conn = state.conn.get()?;
    conn.transaction::<Deal, AppError, _>(|conn| {
        // The contact lookup is org-scoped so a contact in another tenant
        // is indistinguishable from a missing one.
        let contact: Option<Contact> = contacts::table
            .filter(contacts::organization_id.eq(ctx.organization_id))
            .filter(contacts::id.eq(input.contact_id))
            .select(Contact::as_select())
            .first(conn)
            .optional()?;
        let contact = contact.ok_or_else(|| AppError::not_found("Contact", input.contact_id))?;

        let currency = resolve_currency(conn, state, ctx.organization_id, input.currency)?;

        let now = Utc::now();
        let deal = Deal {
            id: Uuid::new_v4(),
            organization_id: ctx.organization_id,
            contact_id: contact.id,
            owner_id: ctx.user.id,
            title: input.title,
            amount: amount.clone(),
            currency: currency.clone(),
            status: DealStatus::New.as_str().to_string(),
            stage: DealStage::Qualification.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        deal_repo::insert(conn, &deal)?;

        activity_repo::append(
            conn,
            deal.id,
            None,
            &ActivityPayload::System {
                message: format!("Deal created with amount {amount} {currency}"),
            },
        )?;

        Ok(deal)
    })
}

pub fn update_deal(
    state: &AppState,
    ctx: &OrgContext,
    deal_id: Uuid,
    changes: DealChanges,
) -> Result<Deal, AppError> {
    if let Some(title) = &changes.title {
        if title.trim().is_empty() || title.len() > 255 {
            return Err(AppError::validation_field(
                "Title must be between 1 and 255 characters",
                "title",
            ));
        }
    }
    if let Some(amount) = &changes.amount {
        if amount < &zero() {
            return Err(AppError::validation_field(
                "Amount must not be negative",
                "amount",
            ));
        }
    }

    let mut conn = state.conn.get()?;
    conn.transaction::<Deal, AppError, _>(|conn| {
        let deal = deal_repo::find_for_org(conn, ctx.organization_id, deal_id)?
            .ok_or_else(|| AppError::not_found("Deal", deal_id))?;

        state
            .policy
            .check_resource_ownership(ctx.user.id, deal.owner_id, ctx.role, "Deal")?;

        let old_status = deal.deal_status();
        let old_stage = deal.deal_stage();

        let final_title = changes.title.unwrap_or_else(|| deal.title.clone());
        let final_amount = changes.amount.unwrap_or_else(|| deal.amount.clone());
        let final_currency = match changes.currency {
            Some(code) => {
                let code = code.to_uppercase();
                if !state.config.is_supported_currency(&code) {
                    return Err(AppError::validation_field(
                        format!("Currency '{code}' is not supported"),
                        "currency",
                    ));
                }
                code
            }
            None => deal.currency.clone(),
        };

        let final_status = match changes.status {
            Some(new_status) if new_status != old_status => {
                DealStateMachine::validate_status_transition(old_status, new_status)?;
                if new_status == DealStatus::Won && final_amount <= zero() {
                    return Err(AppError::validation(format!(
                        "Cannot mark deal as won with amount {final_amount}. Amount must be greater than 0"
                    )));
                }
                new_status
            }
            _ => old_status,
        };

        // A terminal status wins over whatever stage the caller supplied.
        let final_stage = match DealStateMachine::forced_stage(final_status) {
            Some(forced) if final_status != old_status => forced,
            _ => match changes.stage {
                Some(new_stage) if new_stage != old_stage => {
                    DealStateMachine::validate_stage_transition(
                        old_stage,
                        new_stage,
                        ctx.role,
                        &state.policy,
                    )?;
                    new_stage
                }
                _ => old_stage,
            },
        };

        let updated = deal_repo::update_fields(
            conn,
            deal.id,
            &final_title,
            &final_amount,
            &final_currency,
            final_status.as_str(),
            final_stage.as_str(),
        )?;

        if final_status != old_status {
            activity_repo::append(
                conn,
                deal.id,
                Some(ctx.user.id),
                &ActivityPayload::StatusChanged {
                    from: old_status,
                    to: final_status,
                },
            )?;
        }
        if final_stage != old_stage {
            activity_repo::append(
                conn,
                deal.id,
                Some(ctx.user.id),
                &ActivityPayload::StageChanged {
                    from: old_stage,
                    to: final_stage,
                },
            )?;
        }

        Ok(updated)
    })
}

pub fn delete_deal(state: &AppState, ctx: &OrgContext, deal_id: Uuid) -> Result<(), AppError> {
    let mut conn = state.conn.get()?;
    conn.transaction::<(), AppError, _>(|conn| {
        let deal = deal_repo::find_for_org(conn, ctx.organization_id, deal_id)?
            .ok_or_else(|| AppError::not_found("Deal", deal_id))?;

        state
            .policy
            .check_resource_ownership(ctx.user.id, deal.owner_id, ctx.role, "Deal")?;

        deal_repo::delete(conn, deal.id)?;
        Ok(())
    })
}
