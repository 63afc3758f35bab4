use contracts::domain::user::aggregate::{AppUser, LoginRequest, SignupRequest};

use super::password;
use super::repository::UserRepository;

pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    pub async fn signup(&self, request: SignupRequest) -> anyhow::Result<AppUser> {
        if request.email.trim().is_empty() || !request.email.contains('@') {
            return Err(anyhow::anyhow!("Invalid email format"));
        }
        if request.password.is_empty() {
            return Err(anyhow::anyhow!("Password cannot be empty"));
        }
        if self.repo.find_by_email(&request.email).await?.is_some() {
            return Err(anyhow::anyhow!("Email already exists"));
        }

        let password_hash = password::hash_password(&request.password)?;
        let mut user = AppUser {
            name: request.name,
            email: request.email,
            role: request.role.unwrap_or_default(),
            ..Default::default()
        };
        user.id = self.repo.create(&user, &password_hash).await?;
        Ok(user)
    }

    /// Verify credentials. `Ok(None)` means the email is unknown or the
    /// password does not match; the caller cannot tell which.
    pub async fn login(&self, request: LoginRequest) -> anyhow::Result<Option<AppUser>> {
        let Some((user, hash)) = self.repo.find_by_email_with_hash(&request.email).await? else {
            return Ok(None);
        };
        if !password::verify_password(&request.password, &hash)? {
            return Ok(None);
        }
        Ok(Some(user))
    }
}
