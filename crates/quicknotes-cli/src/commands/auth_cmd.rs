use quicknotes_core::services::{check_session, sign_out, AuthFlow, AuthMode, AuthOutcome, GateDecision};

use crate::auth::{auth_client, clear_stored_session};
use crate::cli::AuthCommands;
use crate::commands::common::load_profile_config;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            authenticate(AuthMode::SignIn, &email, &password, global_profile).await
        }
        AuthCommands::Signup { email, password } => {
            authenticate(AuthMode::SignUp, &email, &password, global_profile).await
        }
        AuthCommands::Status => {
            let (profile_name, config) = load_profile_config(global_profile)?;
            let auth = auth_client(&profile_name, &config)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            match check_session(&auth).await {
                GateDecision::Proceed(session) => {
                    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                    println!(
                        "Profile '{}' is signed in as {} (expires_at={})",
                        profile_name, email_label, session.expires_at
                    );
                }
                GateDecision::RedirectToAuth => {
                    println!("Profile '{profile_name}' is not signed in.");
                }
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let profile_name = match load_profile_config(global_profile) {
                Ok((profile_name, config)) => {
                    let auth = auth_client(&profile_name, &config)
                        .map_err(|error| CliError::Auth(error.to_string()))?;
                    sign_out(&auth).await;
                    profile_name
                }
                Err(_) => {
                    // Without a usable config there is no client, but the
                    // stored session can still be dropped.
                    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
                    let profile_name = config.resolve_profile_name(global_profile);
                    clear_stored_session(&profile_name)
                        .map_err(|error| CliError::Auth(error.to_string()))?;
                    profile_name
                }
            };
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

async fn authenticate(
    mode: AuthMode,
    email: &str,
    password: &str,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let (profile_name, config) = load_profile_config(global_profile)?;
    let auth =
        auth_client(&profile_name, &config).map_err(|error| CliError::Auth(error.to_string()))?;

    match AuthFlow::new(&auth).submit(mode, email, password).await {
        AuthOutcome::Authenticated { session, feedback } => {
            let email_label = session.user.email.as_deref().unwrap_or(email);
            println!("{feedback}: profile '{profile_name}' signed in as {email_label}");
            Ok(())
        }
        AuthOutcome::Rejected { feedback } => Err(CliError::Operation(feedback)),
    }
}
