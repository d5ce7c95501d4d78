//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Manage OAuth 2.0 credentials for one client registration.
#[derive(Debug, Parser)]
#[command(name = "oauth-client")]
#[command(version, about)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        long,
        global = true,
        env = "CONFIG_PATH",
        default_value = "oauth-client.toml"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Issue a state and print the authorization redirect URI
    AuthorizeUri(Target),
    /// Print a usable access token, refreshing if needed
    AccessToken(Target),
    /// Remove the stored access and refresh tokens
    Forget(Target),
}

/// Whose credentials, and for which scope.
#[derive(Debug, PartialEq, Eq, Args)]
pub struct Target {
    /// Application-level user identifier
    pub user_id: String,
    /// Space-separated scope tokens
    pub scope: Option<String>,
}

impl Command {
    pub fn target(&self) -> &Target {
        match self {
            Command::AuthorizeUri(target)
            | Command::AccessToken(target)
            | Command::Forget(target) => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn target(user_id: &str, scope: Option<&str>) -> Target {
        Target {
            user_id: user_id.into(),
            scope: scope.map(str::to_owned),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_command_user_and_scope() {
        let cli = Cli::try_parse_from(["oauth-client", "access-token", "alice", "read write"])
            .unwrap();
        assert_eq!(
            cli.command,
            Command::AccessToken(target("alice", Some("read write")))
        );
        assert_eq!(cli.command.target().user_id, "alice");
    }

    #[test]
    fn config_flag_may_follow_the_command() {
        let cli = Cli::try_parse_from([
            "oauth-client",
            "forget",
            "--config",
            "/etc/oauth.toml",
            "alice",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Forget(target("alice", None)));
        assert_eq!(cli.config, PathBuf::from("/etc/oauth.toml"));
    }

    #[test]
    fn authorize_uri_uses_kebab_case_name() {
        let cli = Cli::try_parse_from(["oauth-client", "authorize-uri", "bob"]).unwrap();
        assert_eq!(cli.command, Command::AuthorizeUri(target("bob", None)));
    }

    #[test]
    fn rejects_bad_invocations() {
        let kind = |args: &[&str]| Cli::try_parse_from(args).unwrap_err().kind();

        assert_eq!(kind(&["oauth-client"]), ErrorKind::MissingSubcommand);
        assert_eq!(
            kind(&["oauth-client", "authorize-uri"]),
            ErrorKind::MissingRequiredArgument
        );
        assert_eq!(
            kind(&["oauth-client", "refresh", "alice"]),
            ErrorKind::InvalidSubcommand
        );
        assert!(Cli::try_parse_from(["oauth-client", "authorize-uri", "alice", "--config"]).is_err());
        assert_eq!(
            kind(&["oauth-client", "authorize-uri", "alice", "read", "extra"]),
            ErrorKind::UnknownArgument
        );
    }
}
