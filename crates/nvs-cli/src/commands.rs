// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subcommand implementations. Each writes its report to `out`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use nvs_app_core::config::{ConfigError, ConfigService};
use nvs_app_core::prefs::CliPrefs;
use nvs_config_fs::FsConfigStore;
use nvs_core::{EntryRecord, Store, UpdatePayload, Value};
use nvs_schema::DeviceConfig;
use tracing::{info, warn};

use crate::cli::{
    Cli, Command, ConfigArgs, EditArgs, GetArgs, InputArgs, PayloadArgs, PrefsArgs, ShowArgs,
};
use crate::output;

/// Dispatch the parsed command line.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config_dir = cli.config_dir.as_deref();
    match cli.command {
        Command::Dump(args) => dump(&args, out),
        Command::Show(args) => show(&args, &load_prefs(config_dir), out),
        Command::Get(args) => get(&args, &load_prefs(config_dir), out),
        Command::Config(args) => config(&args, out),
        Command::Edit(args) => edit(&args, out),
        Command::Payload(args) => payload(&args, out),
        Command::Prefs(args) => prefs(&args, config_dir, out),
    }
}

fn open_config(config_dir: Option<&Path>) -> Result<ConfigService<FsConfigStore>, ConfigError> {
    let store = match config_dir {
        Some(dir) => FsConfigStore::at(dir)?,
        None => FsConfigStore::new()?,
    };
    Ok(ConfigService::new(store))
}

fn load_prefs(config_dir: Option<&Path>) -> CliPrefs {
    match open_config(config_dir).and_then(|service| CliPrefs::load(&service)) {
        Ok(prefs) => prefs,
        Err(err) => {
            warn!(%err, "using default preferences");
            CliPrefs::default()
        }
    }
}

fn read_dump(input: &InputArgs) -> Result<Store> {
    let bytes = if input.file.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read dump from stdin")?;
        buf
    } else {
        fs::read(&input.file)
            .with_context(|| format!("failed to read {}", input.file.display()))?
    };
    Store::decode(&bytes).with_context(|| format!("failed to decode {}", input.file.display()))
}

fn dump(args: &InputArgs, out: &mut impl Write) -> Result<()> {
    let store = read_dump(args)?;
    for line in store.dump_script() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn show(args: &ShowArgs, prefs: &CliPrefs, out: &mut impl Write) -> Result<()> {
    let store = read_dump(&args.input)?;
    let format = args.format.unwrap_or(prefs.format);
    let sign_extend = args.sign_extend.unwrap_or(prefs.sign_extend);
    out.write_all(output::render(&store.records(), format, sign_extend)?.as_bytes())?;
    Ok(())
}

fn get(args: &GetArgs, prefs: &CliPrefs, out: &mut impl Write) -> Result<()> {
    let store = read_dump(&args.input)?;
    let value = store.get(&args.namespace, &args.key, args.tag)?;
    let record = EntryRecord {
        namespace: args.namespace.clone(),
        key: args.key.clone(),
        tag: args.tag,
        value,
    };
    let sign_extend = args.sign_extend.unwrap_or(prefs.sign_extend);
    writeln!(out, "{}", output::value_text(&record, sign_extend))?;
    Ok(())
}

fn config(args: &ConfigArgs, out: &mut impl Write) -> Result<()> {
    let store = read_dump(&args.input)?;
    let device = DeviceConfig::project(&store)?;
    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&device)?)?;
    } else {
        write!(out, "{device}")?;
    }
    Ok(())
}

fn edit(args: &EditArgs, out: &mut impl Write) -> Result<()> {
    let mut store = read_dump(&args.input)?;
    let mut session = store.snapshot();
    for set in &args.sets {
        session
            .store_mut()
            .set(&set.namespace, &set.key, set.value.clone(), set.tag)?;
    }
    let changes = session.commit(&mut store)?;
    for change in &changes {
        writeln!(
            out,
            "{}.{} ({}) = {}: {}",
            change.namespace,
            change.key,
            change.tag,
            change.value,
            hex::encode(change.encode()?)
        )?;
    }
    if changes.is_empty() {
        info!("no field differs from the dump");
    }
    if let Some(path) = &args.out {
        fs::write(path, store.encode()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), changes = changes.len(), "wrote edited dump");
    }
    Ok(())
}

fn payload(args: &PayloadArgs, out: &mut impl Write) -> Result<()> {
    let value = Value::parse(args.tag, &args.value).map_err(|e| anyhow!(e))?;
    let update = UpdatePayload::new(args.namespace.as_str(), args.key.as_str(), args.tag, value)?;
    writeln!(out, "{}", hex::encode(update.encode()?))?;
    Ok(())
}

fn prefs(args: &PrefsArgs, config_dir: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let service = open_config(config_dir).context("failed to open the preferences store")?;
    let mut prefs = CliPrefs::load(&service)?;
    let before = prefs;
    if let Some(format) = args.format {
        prefs.format = format;
    }
    if let Some(sign_extend) = args.sign_extend {
        prefs.sign_extend = sign_extend;
    }
    if prefs != before {
        prefs.save(&service)?;
        info!(path = %service.store().base().display(), "saved preferences");
    }
    writeln!(out, "format = {}", prefs.format)?;
    writeln!(out, "sign_extend = {}", prefs.sign_extend)?;
    Ok(())
}
