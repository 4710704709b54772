use anyhow::{anyhow, bail};
use clap::{Args, Subcommand};
use serde_json::json;

use crate::auth::{self, DigestAlgorithm, TokenSpec, MAX_PAYLOAD_SIZE};
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Print new signed tokens")]
    Generate {
        #[arg(long, env = "ADMIN_SECRET_KEY", hide_env_values = true, help = "Signing key")]
        key: String,
        #[arg(short = 'n', default_value_t = 1, help = "Number of tokens")]
        count: usize,
        #[command(flatten)]
        layout: LayoutArgs,
    },

    #[command(about = "Check a token against a key, exits non-zero when invalid")]
    Verify {
        #[arg(long, env = "ADMIN_SECRET_KEY", hide_env_values = true, help = "Signing key")]
        key: String,
        #[command(flatten)]
        layout: LayoutArgs,
        #[arg(help = "Token to check")]
        token: String,
    },
}

/// Token layout, read from the same variables the server uses
#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    #[arg(
        long,
        env = "TOKEN_DIGEST",
        default_value = "sha1",
        help = "Digest algorithm (sha1 or sha256), must match the server's TOKEN_DIGEST"
    )]
    pub digest: DigestAlgorithm,
    #[arg(
        long,
        env = "TOKEN_PAYLOAD_SIZE",
        help = "Payload bytes, defaults to the digest size"
    )]
    pub payload_size: Option<usize>,
    #[arg(long, help = "Card layout: SHA-1 with a 20 byte payload, ignores --digest")]
    pub short: bool,
}

impl Default for LayoutArgs {
    fn default() -> Self {
        Self {
            digest: DigestAlgorithm::Sha1,
            payload_size: None,
            short: false,
        }
    }
}

impl LayoutArgs {
    pub fn spec(&self) -> anyhow::Result<TokenSpec> {
        if self.short {
            return Ok(TokenSpec::new(DigestAlgorithm::Sha1));
        }
        let spec = TokenSpec::new(self.digest);
        match self.payload_size {
            None => Ok(spec),
            Some(size) if size == 0 || size > MAX_PAYLOAD_SIZE => {
                bail!("--payload-size must be between 1 and {}", MAX_PAYLOAD_SIZE)
            }
            Some(size) => Ok(spec.with_payload_size(size)),
        }
    }
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Generate { key, count, layout } => {
            if key.is_empty() {
                bail!("a signing key is required (--key or ADMIN_SECRET_KEY)");
            }
            let spec = layout.spec()?;
            let tokens = (0..count)
                .map(|_| auth::generate(key.as_bytes(), spec))
                .collect::<Result<Vec<_>, _>>()?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    &format!("Generated {} token(s)", tokens.len()),
                    Some(json!({ "algorithm": spec.algorithm.to_string(), "tokens": tokens })),
                )?,
                OutputFormat::Text => {
                    for token in &tokens {
                        println!("{}", token);
                    }
                }
            }
            Ok(())
        }
        TokenCommands::Verify { key, layout, token } => {
            if auth::verify(&token, key.as_bytes(), layout.spec()?) {
                output_success(&output_format, "Token is valid", None)
            } else {
                output_error(&output_format, "Token is invalid", Some("INVALID_TOKEN"))?;
                Err(anyhow!("invalid token"))
            }
        }
    }
}
