//! Platform settings: commission, shipping, announcement banner.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use livestall_core::validation::SettingsInput;

use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAdmin, flash_success};
use crate::models::PlatformSettings;
use crate::routes::layout::PageContext;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "admin/settings.html")]
pub struct SettingsTemplate {
    pub page: PageContext,
    pub input: SettingsInput,
}

/// Prefill the form from saved settings.
fn input_from(settings: &PlatformSettings) -> SettingsInput {
    SettingsInput {
        commission_percent: settings.commission_percent.normalize().to_string(),
        flat_shipping_rate: format!("{:.2}", settings.flat_shipping_rate),
        free_shipping_threshold: settings
            .free_shipping_threshold
            .map(|t| format!("{t:.2}"))
            .unwrap_or_default(),
        announcement: settings.announcement.clone().unwrap_or_default(),
    }
}

#[instrument(skip(state, page, admin), fields(user_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let settings = state.platform_settings().await?;
    Ok(SettingsTemplate {
        page,
        input: input_from(&settings),
    })
}

#[instrument(skip(state, session, page, admin, input), fields(user_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Form(input): Form<SettingsInput>,
) -> Result<Response> {
    let fields = match input.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            return Ok(SettingsTemplate {
                page: page.with_error(errors.to_string()),
                input,
            }
            .into_response());
        }
    };

    let settings = PlatformSettings {
        commission_percent: fields.commission_percent,
        flat_shipping_rate: fields.flat_shipping_rate,
        free_shipping_threshold: fields.free_shipping_threshold,
        announcement: fields.announcement,
    };
    state.save_platform_settings(&settings).await?;

    tracing::info!(
        commission = %settings.commission_percent,
        shipping = %settings.flat_shipping_rate,
        "Platform settings saved"
    );
    flash_success(&session, "Settings saved").await;
    Ok(Redirect::to("/admin/settings").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_form_prefill_round_trips_through_validation() {
        let settings = PlatformSettings {
            commission_percent: Decimal::new(1250, 2),
            announcement: Some("Hello".to_owned()),
            ..PlatformSettings::default()
        };
        let input = input_from(&settings);
        assert_eq!(input.commission_percent, "12.5");

        let fields = input.validate().unwrap();
        assert_eq!(fields.commission_percent, settings.commission_percent);
        assert_eq!(fields.flat_shipping_rate, settings.flat_shipping_rate);
        assert_eq!(fields.free_shipping_threshold, settings.free_shipping_threshold);
        assert_eq!(fields.announcement, settings.announcement);
    }
}
