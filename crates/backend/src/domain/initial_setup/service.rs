use contracts::domain::initial_setup::aggregate::InitialSetup;

use super::repository::InitialSetupRepository;

pub struct InitialSetupService {
    repo: InitialSetupRepository,
}

impl InitialSetupService {
    pub fn new(repo: InitialSetupRepository) -> Self {
        Self { repo }
    }

    pub async fn save(&self, profile: InitialSetup) -> anyhow::Result<InitialSetup> {
        if profile.company_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Company name cannot be empty"));
        }
        self.repo.save(profile).await
    }

    pub async fn get_latest(&self) -> anyhow::Result<Option<InitialSetup>> {
        self.repo.get_latest().await
    }
}
