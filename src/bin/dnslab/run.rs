// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the commands.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{anyhow, Context, Result};
use env_logger::Env;
use log::{error, info};

use dnslab::bootstrap::StepOutcome;
use dnslab::layout::{DOMAIN_EXTRACT, IOC_DETECT, REGISTERED_DOMAIN_EXTRACT};
use dnslab::platform::local::LocalPlatform;
use dnslab::platform::Platform;
use dnslab::Environment;

use crate::args::{Args, Command, EnvArgs};
use crate::config::{self, Settings};

/// Runs the command given on the command line.
pub fn run(args: Args) {
    env_logger::init_from_env(Env::new().default_filter_or("warn"));

    if let Err(e) = try_running(args.command) {
        let mut message = String::from("Failed to run:");
        for (i, cause) in e.chain().enumerate() {
            write!(message, "\n[{}] {}", i + 1, cause).unwrap();
        }
        message.push_str("\nExiting with failure.");
        error!("{}", message);
        process::exit(1);
    }
}

fn try_running(command: Command) -> Result<()> {
    match command {
        Command::Bootstrap { env, with_model } => bootstrap(&env, with_model),
        Command::Cleanup(env) => cleanup(&env),
        Command::Names(env) => names(&env),
        Command::Extract {
            env,
            registered,
            uris,
        } => extract(&env, registered, uris),
        Command::Detect { env, domains } => detect(&env, domains),
    }
}

/// Loads the settings and creates the environment on the local
/// platform.
fn open_environment(args: &EnvArgs) -> Result<Environment<LocalPlatform>> {
    let settings = if let Some(ref config_path) = args.config {
        info!("Loading the configuration from {}.", config_path.display());
        config::load_from_path(config_path).context("failed to load the configuration")?
    } else {
        info!("Loading the configuration from the command line.");
        config::load_from_args(args).context("failed to load the configuration")?
    };
    let Settings {
        identity,
        local,
        policies,
        extractor,
    } = settings;
    Ok(Environment::new(LocalPlatform::new(&local), identity)
        .with_policies(policies)
        .with_extractor(extractor))
}

fn bootstrap(args: &EnvArgs, with_model: bool) -> Result<()> {
    let env = open_environment(args)?;
    let summary = env
        .bootstrap()
        .context("failed to bootstrap the environment")?;

    let mut out = io::stdout().lock();
    writeln!(out, "Default database: {}", summary.database)?;
    writeln!(out, "Files are stored in {}", summary.scratch_path)?;
    if summary.geodata.copied {
        writeln!(out, "Staged the GeoIP database.")?;
    }

    if with_model {
        env.load_and_register_ioc_detect_model()
            .context("failed to register the DGA model")?;
        writeln!(out, "Registered {}.", IOC_DETECT)?;
    }
    Ok(())
}

fn cleanup(args: &EnvArgs) -> Result<()> {
    let env = open_environment(args)?;
    let report = env.cleanup().context("failed to clean up")?;

    let mut out = io::stdout().lock();
    for (step, outcome) in report.steps() {
        match outcome {
            StepOutcome::Done => writeln!(out, "{}: removed", step)?,
            StepOutcome::Absent => writeln!(out, "{}: absent", step)?,
            StepOutcome::Failed(e) => writeln!(out, "{}: failed ({})", step, e)?,
        }
    }
    Ok(())
}

fn names(args: &EnvArgs) -> Result<()> {
    let env = open_environment(args)?;
    write_names(&env, &mut io::stdout().lock())
}

fn write_names(env: &Environment<LocalPlatform>, out: &mut impl Write) -> Result<()> {
    let layout = env.layout();
    writeln!(out, "namespace\t{}", layout.namespace)?;
    writeln!(out, "scratch_path\t{}", layout.scratch_path)?;
    writeln!(out, "database\t{}", layout.database)?;
    writeln!(out, "registered_model\t{}", layout.registered_model)?;
    writeln!(out, "experiment\t{}", layout.experiment)?;
    Ok(())
}

fn extract(args: &EnvArgs, registered: bool, uris: Vec<String>) -> Result<()> {
    let env = open_environment(args)?;
    env.register_domain_functions()
        .context("failed to register the domain functions")?;
    let function = if registered {
        REGISTERED_DOMAIN_EXTRACT
    } else {
        DOMAIN_EXTRACT
    };
    let uris = inputs(uris, io::stdin().lock())?;
    write_results(&env, function, &uris, false, &mut io::stdout().lock())
}

fn detect(args: &EnvArgs, domains: Vec<String>) -> Result<()> {
    let env = open_environment(args)?;
    env.load_and_register_ioc_detect_model()
        .context("failed to register the DGA model")?;
    let domains = inputs(domains, io::stdin().lock())?;
    write_results(&env, IOC_DETECT, &domains, true, &mut io::stdout().lock())
}

/// Invokes the query function `function` on each input and writes one
/// result per line, preceded by the input and a tab if `with_input` is
/// set.
fn write_results(
    env: &Environment<LocalPlatform>,
    function: &str,
    inputs: &[String],
    with_input: bool,
    out: &mut impl Write,
) -> Result<()> {
    for input in inputs {
        let result = env
            .platform()
            .functions()
            .invoke(function, input)
            .ok_or_else(|| anyhow!("{} is not registered", function))?;
        if with_input {
            writeln!(out, "{}\t{}", input, result)?;
        } else {
            writeln!(out, "{}", result)?;
        }
    }
    Ok(())
}

/// Returns `given`, or the non-empty lines of `fallback` if `given` is
/// empty.
fn inputs(given: Vec<String>, fallback: impl BufRead) -> Result<Vec<String>> {
    if !given.is_empty() {
        return Ok(given);
    }
    let mut lines = Vec::new();
    for line in fallback.lines() {
        let line = line.context("failed to read standard input")?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_owned());
        }
    }
    Ok(lines)
}
