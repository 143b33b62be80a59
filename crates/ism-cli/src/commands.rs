use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ism_cli::inspect::{
    check_mapping, diff_documents, mapping_to_nodes, nodes_to_mapping, parse_object,
};
use ism_cli::settings::Settings;
use ism_cli::summary::{
    diff_table, field_table, issue_table, notification_table, print_toasts, unsaved_line,
};
use ism_form::FormError;
use ism_mapping::{EditorMode, MappingEditor};
use ism_model::ApiRequest;
use ism_service::{
    ApiCaller, CreateIndexForm, HttpApiCaller, NotificationSettings, ServiceError, ToastLog,
};
use serde_json::{Value, json};
use tracing::info;

use crate::cli::{
    ApiCallArgs, ApiCommand, CheckArgs, Command, CreateIndexArgs, DiffArgs, IndexCommand,
    MappingCommand, NotificationSubmitArgs, NotificationsCommand, PutMappingArgs,
};

pub async fn run(command: Command, settings: &Settings, config_path: &Path) -> Result<i32> {
    match command {
        Command::Mapping(command) => run_mapping(&command),
        Command::Diff(args) => run_diff(&args),
        Command::Notifications(command) => run_notifications(&command, settings).await,
        Command::Index(command) => run_index(&command, settings).await,
        Command::Api(ApiCommand::Call(args)) => run_api_call(&args, settings).await,
        Command::Settings => show_settings(settings, config_path),
    }
}

fn run_mapping(command: &MappingCommand) -> Result<i32> {
    match command {
        MappingCommand::Nodes(args) => {
            let nodes = mapping_to_nodes(&read_input(&args.input)?)?;
            println!("{}", serde_json::to_string_pretty(&nodes)?);
            Ok(0)
        }
        MappingCommand::Object(args) => {
            let object = nodes_to_mapping(&read_input(&args.input)?)?;
            println!("{}", serde_json::to_string_pretty(&object)?);
            Ok(0)
        }
        MappingCommand::Check(args) => run_check(args),
    }
}

fn run_check(args: &CheckArgs) -> Result<i32> {
    let text = read_input(&args.input)?;
    let saved = match &args.saved {
        Some(path) => Some(parse_object(&read_input(path)?)?),
        None => None,
    };
    let report = check_mapping(&text, saved)?;
    if !report.is_valid() {
        eprintln!("{}", issue_table(&report.issues));
        return Ok(1);
    }
    println!("{}", field_table(&report.fields));
    let new = report.fields.iter().filter(|f| !f.locked).count();
    println!("{} fields, {new} new", report.fields.len());
    Ok(0)
}

fn run_diff(args: &DiffArgs) -> Result<i32> {
    let original = read_json(&args.original)?;
    let current = read_json(&args.current)?;
    let diff = diff_documents(&current, &original, &args.key)?;
    if diff.is_dirty() {
        println!("{}", diff_table(&diff));
    }
    println!("{}", unsaved_line(diff.count()));
    Ok(0)
}

async fn run_notifications(command: &NotificationsCommand, settings: &Settings) -> Result<i32> {
    let log = Arc::new(ToastLog::new());
    let mut page = NotificationSettings::new(connect(settings)?, Arc::clone(&log));
    let loaded = page.load().await;
    print_toasts(&log.drain());
    loaded?;

    match command {
        NotificationsCommand::Show => {
            println!("{}", notification_table(&page.rows()));
            Ok(0)
        }
        NotificationsCommand::Submit(args) => submit_notifications(&mut page, args, &log).await,
    }
}

async fn submit_notifications(
    page: &mut NotificationSettings<HttpApiCaller, Arc<ToastLog>>,
    args: &NotificationSubmitArgs,
    log: &ToastLog,
) -> Result<i32> {
    let rows = page.rows();
    let Some(row) = rows.iter().find(|row| row.action_name == args.action) else {
        let known: Vec<&str> = rows.iter().map(|row| row.action_name.as_str()).collect();
        bail!("unknown action '{}' (known: {})", args.action, known.join(", "));
    };
    if let Some(success) = args.success {
        page.set_success(row.index, success)?;
    }
    if let Some(failure) = args.failure {
        page.set_failure(row.index, failure)?;
    }
    if !args.channels.is_empty() {
        page.set_channels(row.index, &args.channels)?;
    }

    let unsaved = page.unsaved_count();
    println!("{}", unsaved_line(unsaved));
    if unsaved == 0 {
        return Ok(0);
    }
    let submitted = page.submit().await;
    print_toasts(&log.drain());
    let code = report(submitted)?;
    if code == 0 {
        println!("{}", notification_table(&page.rows()));
    }
    Ok(code)
}

async fn run_index(command: &IndexCommand, settings: &Settings) -> Result<i32> {
    match command {
        IndexCommand::Create(args) => create_index(args, settings).await,
        IndexCommand::PutMapping(args) => put_mapping(args, settings).await,
    }
}

async fn create_index(args: &CreateIndexArgs, settings: &Settings) -> Result<i32> {
    let mut form = CreateIndexForm::new()?;
    form.set_index_name(&args.name)?;
    form.set_shards(args.shards)?;
    form.set_replicas(args.replicas)?;
    form.set_aliases(&args.aliases)?;
    if let Some(path) = &args.settings {
        form.merge_advanced_settings(&read_input(path)?)?;
    }
    if let Some(path) = &args.mapping {
        load_mapping(form.editor_mut(), &read_input(path)?, settings.editor.mode)?;
    }
    send_index(&form, args.dry_run, settings).await
}

async fn put_mapping(args: &PutMappingArgs, settings: &Settings) -> Result<i32> {
    let saved = parse_object(&read_input(&args.saved)?)?;
    let mut form = CreateIndexForm::for_existing(&args.name, json!({}), saved)?;
    load_mapping(
        form.editor_mut(),
        &read_input(&args.mapping)?,
        settings.editor.mode,
    )?;
    send_index(&form, args.dry_run, settings).await
}

/// Put `text` into the editor through JSON mode, then switch to `mode`.
/// Switching to visual checks the mapping right away.
fn load_mapping(editor: &mut MappingEditor, text: &str, mode: EditorMode) -> Result<()> {
    editor.switch_to(EditorMode::Json)?;
    editor.set_json_text(text);
    editor
        .switch_to(mode)
        .context("mapping rejected by the editor")?;
    Ok(())
}

async fn send_index(form: &CreateIndexForm, dry_run: bool, settings: &Settings) -> Result<i32> {
    if dry_run {
        let requests = match form.build_requests().await {
            Ok(requests) => requests,
            Err(err) => return report(Err(err)),
        };
        if requests.is_empty() {
            println!("Nothing to send");
        }
        println!("{}", serde_json::to_string_pretty(&requests)?);
        return Ok(0);
    }
    let log = ToastLog::new();
    let submitted = form.submit(&connect(settings)?, &log).await;
    print_toasts(&log.drain());
    report(submitted)
}

async fn run_api_call(args: &ApiCallArgs, settings: &Settings) -> Result<i32> {
    let mut request = ApiRequest::new(&args.endpoint).with_method(args.method.into());
    if let Some(data) = &args.data {
        let data: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.with_data(data);
    }
    let response = connect(settings)?.call(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(if response.ok { 0 } else { 1 })
}

fn show_settings(settings: &Settings, config_path: &Path) -> Result<i32> {
    println!("# {}", config_path.display());
    print!("{}", toml::to_string_pretty(settings)?);
    Ok(0)
}

fn connect(settings: &Settings) -> Result<HttpApiCaller> {
    info!(server = %settings.server.url, "connecting");
    Ok(HttpApiCaller::new(
        &settings.server.url,
        settings.server.data_source_id.as_deref(),
        settings.timeout(),
    )?)
}

/// Exit code for a service result. Field errors are listed and give 1;
/// other errors propagate.
fn report(result: ism_service::Result<()>) -> Result<i32> {
    match result {
        Ok(()) => Ok(0),
        Err(ServiceError::Validation(FormError::ValidationFailed { errors })) => {
            for (path, message) in &errors {
                eprintln!("{path}: {message}");
            }
            Ok(1)
        }
        Err(err) => Err(err.into()),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}
