//! Offline identity management against the credential store.

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use coursehub_core::{validate_email, validate_name, validate_password};
use coursehub_gateway::{Identity, IdentityStore, Role};
use rand::Rng;

use crate::ui;

/// Characters used for generated passwords.
const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789!@#$%^&*";

/// Arguments for admin commands.
pub struct AdminArgs {
    /// The admin action to perform.
    pub action: AdminAction,
    /// Data directory override.
    pub data_dir: Option<PathBuf>,
}

/// Admin actions.
pub enum AdminAction {
    /// Create an identity.
    Create {
        email: String,
        name: String,
        password: Option<String>,
        generate_password: bool,
        role: String,
    },
    /// List all identities.
    List,
    /// Change an identity's role.
    SetRole { email: String, role: String },
    /// Delete an identity.
    Delete { email: String },
}

/// Run the admin command.
///
/// Sessions held in the cache are not touched; a changed role reaches a
/// logged-in identity on its next login or profile update.
///
/// # Errors
///
/// Returns error if the operation fails.
pub fn run_admin(args: AdminArgs) -> anyhow::Result<()> {
    let data_dir = args.data_dir.unwrap_or_else(coursehub_core::Config::data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let store = IdentityStore::open(&data_dir).context("Failed to open credential store")?;

    match args.action {
        AdminAction::Create {
            email,
            name,
            password,
            generate_password: generate,
            role,
        } => create_identity(&store, &email, &name, password, generate, &role),
        AdminAction::List => list_identities(&store),
        AdminAction::SetRole { email, role } => set_role(&store, &email, &role),
        AdminAction::Delete { email } => delete_identity(&store, &email),
    }
}

fn parse_role(role: &str) -> anyhow::Result<Role> {
    role.parse()
        .map_err(|_| anyhow!("Invalid role: {role}. Use: user or admin"))
}

fn find(store: &IdentityStore, email: &str) -> anyhow::Result<Identity> {
    store
        .get_by_email(email)?
        .ok_or_else(|| anyhow!("No identity with email {email}"))
}

fn create_identity(
    store: &IdentityStore,
    email: &str,
    name: &str,
    password: Option<String>,
    generate: bool,
    role: &str,
) -> anyhow::Result<()> {
    let role = parse_role(role)?;
    let email = validate_email(email)?;
    let name = validate_name(name)?;

    let password = match password {
        _ if generate => {
            let pwd = generate_password(16);
            ui::success(&format!("Generated password: {pwd}"));
            pwd
        }
        Some(pwd) => pwd,
        None => {
            let pwd = ui::prompts::password("Password")?;
            if pwd != ui::prompts::password("Confirm password")? {
                return Err(anyhow!("Passwords do not match"));
            }
            pwd
        }
    };
    validate_password(&password)?;

    let mut identity = Identity::new(&name, &email, &password, role)?;
    identity.is_verified = true;
    store.create(&identity)?;

    ui::success(&format!("Created {email} with role '{role}'"));
    Ok(())
}

fn list_identities(store: &IdentityStore) -> anyhow::Result<()> {
    let identities = store.list()?;

    if identities.is_empty() {
        ui::info("No identities yet.");
        ui::info(
            "Run 'coursehub admin create --email admin@example.com --name Admin --generate-password'",
        );
        return Ok(());
    }

    ui::info(&format!("Identities ({}):", identities.len()));
    println!();
    println!("{:<32} {:<20} {:<8} {:<20}", "EMAIL", "NAME", "ROLE", "CREATED");
    println!("{}", "-".repeat(82));

    for identity in identities {
        println!(
            "{:<32} {:<20} {:<8} {:<20}",
            identity.email,
            identity.name,
            identity.role.as_str(),
            identity.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

fn set_role(store: &IdentityStore, email: &str, role: &str) -> anyhow::Result<()> {
    let role = parse_role(role)?;
    let mut identity = find(store, email)?;

    identity.role = role;
    store.update(&identity)?;

    ui::success(&format!("{email} is now '{role}'"));
    Ok(())
}

fn delete_identity(store: &IdentityStore, email: &str) -> anyhow::Result<()> {
    let identity = find(store, email)?;

    let admins = store.list()?.iter().filter(|i| i.role.is_admin()).count();
    if identity.role.is_admin() && admins <= 1 {
        return Err(anyhow!("Cannot delete the last admin"));
    }

    store.delete(&identity.id)?;
    ui::success(&format!("Deleted {email}"));
    Ok(())
}

/// Random password from [`PASSWORD_CHARSET`].
fn generate_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_password() {
        let pwd = generate_password(16);
        assert_eq!(pwd.len(), 16);
        assert!(pwd.bytes().all(|b| PASSWORD_CHARSET.contains(&b)));
        assert_ne!(pwd, generate_password(16));
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("Admin").unwrap(), Role::Admin);
        assert!(parse_role("owner").is_err());
    }
}
