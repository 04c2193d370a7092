//! Onboarding survey submission

use super::{Dashboard, DashboardResult};
use crate::forms::SurveyForm;
use crate::models::User;

impl Dashboard {
    /// Save all four answers, then mark the cached user as segmented
    ///
    /// The upsert is idempotent, so submitting twice is harmless.
    pub async fn submit_survey(&self, form: &SurveyForm) -> DashboardResult<User> {
        let user = self.require_user()?;
        let filters = form.to_filters()?;

        let saved = self
            .call(
                "upsert_user_filters",
                self.store.upsert_user_filters(&user.id, &filters),
            )
            .await?;

        let updated = user.with_filters(saved);
        if !self.session.update_user(updated.clone()) {
            tracing::warn!(user_id = %updated.id, "Session changed while the survey was saving");
        }
        tracing::info!(user_id = %updated.id, "Segmentation survey completed");
        Ok(updated)
    }
}
