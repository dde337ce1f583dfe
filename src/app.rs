use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheSummary, PendingValidation, SessionCaches};
use crate::cli::{Cli, Commands, ExpireArgs, SessionArgs, StateCommands, ValidateArgs};
use crate::config::Config;
use crate::decision::{AnthropicBackend, DecisionBackend, DisabledBackend};
use crate::error::AppError;
use crate::hooks::{HookEnv, HookEvent, HookInput, last_user_message, record_validation};
use crate::output::{output_state_json, print_state_table};
use crate::statusline::{
    ExpiryScheduler, STATUSLINE_FILE_PREFIX, StatusLineState, format_statusline,
    format_statusline_json,
};
use crate::store::{SessionKey, StateContext, resolve_state_dir};
use crate::utils::{SystemClock, process_group_id};

pub(crate) fn run(cli: &Cli, config: &Config) -> Result<(), AppError> {
    let state_dir = resolve_state_dir(cli.state_dir.as_deref(), config.state_dir.as_deref())
        .ok_or(AppError::NoStateDir)?;
    tracing::debug!(state_dir = %state_dir.display(), "resolved state directory");

    match &cli.command {
        Commands::PreTool => handle_hook(HookEvent::PreTool, state_dir, cli, config),
        Commands::PostTool => handle_hook(HookEvent::PostTool, state_dir, cli, config),
        Commands::UserPrompt => handle_hook(HookEvent::UserPrompt, state_dir, cli, config),
        Commands::Stop => handle_hook(HookEvent::Stop, state_dir, cli, config),
        Commands::Validate(args) => handle_validate(args, state_dir),
        Commands::Statusline(args) => handle_statusline(args, state_dir, cli),
        Commands::StatuslineExpire(args) => {
            handle_statusline_expire(args, state_dir);
            Ok(())
        }
        Commands::State { command } => match command {
            StateCommands::Show(args) => handle_state_show(args, state_dir, cli),
            StateCommands::Clear(args) => handle_state_clear(args, state_dir),
        },
    }
}

fn context(state_dir: PathBuf) -> StateContext {
    StateContext::new(state_dir, Arc::new(SystemClock))
}

/// Statusline files are keyed per process group as well as per run
fn status_key(key: &SessionKey) -> SessionKey {
    key.clone().with_process_group(process_group_id())
}

/// Decision backend from flags, config, and environment
fn build_backend(cli: &Cli, config: &Config) -> Box<dyn DecisionBackend> {
    if cli.offline {
        return Box::new(DisabledBackend);
    }
    let api_key = match std::env::var(config.api_key_env()) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            tracing::debug!(env = config.api_key_env(), "no API key; decisions fail open");
            return Box::new(DisabledBackend);
        }
    };
    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| config.model().to_string());
    Box::new(AnthropicBackend::new(
        config.api_url().to_string(),
        api_key,
        model,
        Duration::from_secs(config.timeout_secs()),
    ))
}

fn handle_hook(
    event: HookEvent,
    state_dir: PathBuf,
    cli: &Cli,
    config: &Config,
) -> Result<(), AppError> {
    let input = HookInput::read_from(std::io::stdin().lock())?;
    let Some(key) = input.session_key() else {
        // Without a session there is nothing to scope state to: stay out of the way.
        tracing::warn!(error = %AppError::MissingSession, "allowing");
        return Ok(());
    };

    let ctx = context(state_dir).with_session(key.clone());
    let backend = build_backend(cli, config);
    let settings = config.policy();
    let env = HookEnv {
        caches: SessionCaches::new(&ctx),
        status: StatusLineState::new(&ctx, status_key(&key), ExpiryScheduler::current_exe()),
        backend: backend.as_ref(),
        settings: &settings,
    };

    if let Some(json) = env.handle(event, &input).to_json() {
        println!("{json}");
    }
    Ok(())
}

fn handle_validate(args: &ValidateArgs, state_dir: PathBuf) -> Result<(), AppError> {
    let ctx = context(state_dir).with_session(SessionKey::new(&args.transcript));
    let caches = SessionCaches::new(&ctx);
    let user_message = last_user_message(Path::new(&args.transcript));
    record_validation(
        &caches,
        user_message.as_deref(),
        PendingValidation {
            tool_name: args.tool.clone(),
            file_path: args.file.clone(),
            status: args.status.into(),
            failure_reason: args.reason.clone(),
            ..PendingValidation::default()
        },
    );
    Ok(())
}

/// Session from `--session`, else from host JSON piped on stdin
fn session_from(args: &SessionArgs) -> Result<SessionKey, AppError> {
    if let Some(session) = args.session.as_deref().filter(|s| !s.is_empty()) {
        return Ok(SessionKey::new(session));
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(AppError::MissingSession);
    }
    HookInput::read_from(stdin.lock())?
        .session_key()
        .ok_or(AppError::MissingSession)
}

fn handle_statusline(args: &SessionArgs, state_dir: PathBuf, cli: &Cli) -> Result<(), AppError> {
    let key = match session_from(args) {
        Ok(key) => key,
        Err(AppError::MissingSession) => {
            // An empty line keeps the host statusline blank rather than noisy.
            println!();
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let ctx = context(state_dir);
    let state = StatusLineState::new(&ctx, status_key(&key), ExpiryScheduler::Disabled);
    let entries = state.entries();
    if cli.json {
        println!("{}", format_statusline_json(&entries));
    } else {
        println!("{}", format_statusline(&entries, cli.use_color()));
    }
    Ok(())
}

fn handle_statusline_expire(args: &ExpireArgs, state_dir: PathBuf) {
    std::thread::sleep(Duration::from_millis(args.delay_ms));
    let ctx = context(state_dir);
    StatusLineState::new(&ctx, SessionKey::new(&args.key), ExpiryScheduler::Disabled).remove_entry(
        &args.agent,
        &args.tool,
        args.timestamp,
    );
}

fn statusline_files(state_dir: &Path) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/{STATUSLINE_FILE_PREFIX}*.json",
        glob::Pattern::escape(&state_dir.display().to_string())
    );
    match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "invalid statusline glob");
            Vec::new()
        }
    }
}

fn handle_state_show(args: &SessionArgs, state_dir: PathBuf, cli: &Cli) -> Result<(), AppError> {
    let key = session_from(args)?;
    let files = statusline_files(&state_dir);
    let ctx = context(state_dir).with_session(key.clone());
    let caches = SessionCaches::new(&ctx);

    let mut summaries: Vec<CacheSummary> = caches.all().iter().map(|c| c.summary()).collect();
    summaries.push(CacheSummary::new(
        "statusline",
        files.len(),
        format!("{} file(s) across process groups", files.len()),
    ));

    if cli.json {
        println!("{}", output_state_json(key.as_str(), &summaries));
    } else {
        print_state_table(key.as_str(), &summaries, cli.use_color());
    }
    Ok(())
}

fn handle_state_clear(args: &SessionArgs, state_dir: PathBuf) -> Result<(), AppError> {
    let key = session_from(args)?;
    let files = statusline_files(&state_dir);
    let ctx = context(state_dir).with_session(key);
    SessionCaches::new(&ctx).clear_all();

    let mut removed = 0;
    for path in files {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "failed to remove"),
        }
    }
    println!("Cleared session caches and {removed} statusline file(s).");
    Ok(())
}
