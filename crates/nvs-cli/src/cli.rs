// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command-line surface of `nvs`.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgAction, Args, Parser, Subcommand};
use nvs_app_core::prefs::OutputFormat;
use nvs_core::{TypeTag, Value};

#[derive(Parser, Debug)]
#[command(
    name = "nvs",
    author,
    version,
    about = "Inspect and edit NVS configuration dumps",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). Logs go to stderr.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding saved preferences (defaults to the platform config dir).
    #[arg(long, env = "NVS_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the textual dump: one `ns.key = value` line per entry.
    Dump(InputArgs),
    /// List entries as text, a table, or JSON.
    Show(ShowArgs),
    /// Print a single value.
    Get(GetArgs),
    /// Print the typed device configuration.
    Config(ConfigArgs),
    /// Stage edits, commit them, and print one update payload per change.
    Edit(EditArgs),
    /// Print the update payload for a single field.
    Payload(PayloadArgs),
    /// Show or change saved preferences.
    Prefs(PrefsArgs),
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Dump file (`-` reads stdin).
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output format (overrides the saved preference).
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Show signed tags with their two's-complement reading.
    #[arg(long)]
    pub sign_extend: Option<bool>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Namespace name.
    pub namespace: String,

    /// Entry key.
    pub key: String,

    /// Entry type tag (u8, i32, str, blob, ...).
    #[arg(long, short)]
    pub tag: TypeTag,

    /// Show a signed tag with its two's-complement reading.
    #[arg(long)]
    pub sign_extend: Option<bool>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Field assignment `ns.key:tag=value` (repeatable).
    #[arg(long = "set", value_name = "NS.KEY:TAG=VALUE", required = true)]
    pub sets: Vec<Assignment>,

    /// Write the edited dump here.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Namespace name.
    pub namespace: String,
    /// Entry key.
    pub key: String,
    /// Entry type tag.
    pub tag: TypeTag,
    /// Value: decimal or `0x` hex for integers, text for `str`, hex bytes for `blob`.
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

#[derive(Args, Debug)]
pub struct PrefsArgs {
    /// Save a default output format.
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Save whether signed tags are shown sign-extended.
    #[arg(long)]
    pub sign_extend: Option<bool>,
}

/// One `--set ns.key:tag=value` edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Target namespace.
    pub namespace: String,
    /// Target key.
    pub key: String,
    /// Entry type tag.
    pub tag: TypeTag,
    /// Parsed value.
    pub value: Value,
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, raw) = s
            .split_once('=')
            .ok_or_else(|| format!("`{s}`: expected NS.KEY:TAG=VALUE"))?;
        let (path, tag) = target
            .rsplit_once(':')
            .ok_or_else(|| format!("`{target}`: missing `:TAG`"))?;
        let (namespace, key) = path
            .split_once('.')
            .ok_or_else(|| format!("`{path}`: expected NS.KEY"))?;
        if namespace.is_empty() || key.is_empty() {
            return Err(format!("`{path}`: namespace and key must be non-empty"));
        }
        let tag: TypeTag = tag.parse()?;
        let value = Value::parse(tag, raw)?;
        Ok(Self {
            namespace: namespace.to_owned(),
            key: key.to_owned(),
            tag,
            value,
        })
    }
}
