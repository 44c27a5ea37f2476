use std::path::PathBuf;

use downloader_web_engine::api::{ApiClient, BulkDownloadRequest, DownloadRequest, SettingsUpdate};
use downloader_web_engine::config::{self, ClientConfig};
use downloader_web_engine::display;
use downloader_web_engine::paths::AppPaths;
use downloader_web_engine::session::{RequestKind, Session};
use downloader_web_engine::ui_state::{Panel, StatusKind};
use downloader_web_engine::FilterCategory;

enum Command {
    Info {
        url: String,
        filter: Option<FilterCategory>,
        search: Option<String>,
        csv: bool,
    },
    Download(DownloadRequest),
    Bulk(BulkDownloadRequest),
    Settings(SettingsUpdate),
    Link(String),
}

fn main() -> Result<(), String> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let global = parse_global(&args)?;
    if global.help {
        print_help();
        return Ok(());
    }
    let GlobalArgs {
        server,
        base_dir,
        command_start,
        ..
    } = global;

    let command = parse_command(&args[command_start..])?;

    let paths = base_dir.map(AppPaths::new).or_else(AppPaths::from_env);
    let mut client_config = match &paths {
        Some(p) => config::load_client_config(p).map_err(|e| e.to_string())?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();
    if let Some(server) = server {
        client_config.server_url = server;
    }

    let client = ApiClient::from_config(&client_config).map_err(|e| e.to_string())?;
    let mut session = Session::new(&client_config).with_link_base(client.base_url().clone());
    if let Some(p) = paths {
        p.ensure_dirs().map_err(|e| e.to_string())?;
        session = session.with_activity_log(p);
    }

    match command {
        Command::Info {
            url,
            filter,
            search,
            csv,
        } => run_info(&client, &mut session, &url, filter, search.as_deref(), csv),
        Command::Download(mut request) => {
            if request.output_template.is_none() {
                request.output_template = client_config.default_output_template.clone();
            }
            let ticket = session.begin(RequestKind::Download);
            session.apply_download(ticket, client.download(&request));
            report(&session, Panel::Single)
        }
        Command::Bulk(mut request) => {
            if request.output_template.is_none() {
                request.output_template = client_config.default_output_template.clone();
            }
            let ticket = session.begin(RequestKind::Bulk);
            session.apply_bulk(ticket, client.bulk_download(&request));
            report(&session, Panel::Bulk)
        }
        Command::Settings(update) => {
            let ticket = session.begin(RequestKind::Settings);
            let result = if update == SettingsUpdate::default() {
                client.settings()
            } else {
                client.update_settings(&update)
            };
            let settings = result.as_ref().ok().cloned();
            session.apply_settings(ticket, result);
            report(&session, Panel::Settings)?;
            if let Some(s) = settings {
                println!("Download dir: {}", s.download_dir);
                println!(
                    "Auto-archive bulk: {}",
                    if s.auto_archive_bulk { "on" } else { "off" }
                );
            }
            Ok(())
        }
        Command::Link(path) => {
            println!("{}", client.file_link(&path));
            Ok(())
        }
    }
}

struct GlobalArgs {
    server: Option<String>,
    base_dir: Option<PathBuf>,
    help: bool,
    command_start: usize,
}

/// Flags before the command word. `-h` is only help here, so it can still be
/// passed as a value to a command.
fn parse_global(args: &[String]) -> Result<GlobalArgs, String> {
    let mut global = GlobalArgs {
        server: None,
        base_dir: None,
        help: false,
        command_start: args.len(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                global.help = true;
                return Ok(global);
            }
            "--server" => {
                i += 1;
                global.server = Some(value_of(args, i, "--server")?.to_string());
            }
            "--base-dir" => {
                i += 1;
                global.base_dir = Some(PathBuf::from(value_of(args, i, "--base-dir")?));
            }
            _ => {
                global.command_start = i;
                return Ok(global);
            }
        }
        i += 1;
    }

    global.help = true;
    Ok(global)
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| "missing command (try --help)".to_string())?;

    let mut positional: Vec<String> = Vec::new();
    let mut filter = None;
    let mut search = None;
    let mut csv = false;
    let mut format_id = None;
    let mut audio_only = false;
    let mut template = None;
    let mut dir = None;
    let mut urls_file = None;
    let mut archive = false;
    let mut auto_archive = None;

    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--filter" => {
                i += 1;
                filter = Some(value_of(rest, i, "--filter")?.parse::<FilterCategory>()?);
            }
            "--search" => {
                i += 1;
                search = Some(value_of(rest, i, "--search")?.to_string());
            }
            "--csv" => csv = true,
            "--format" => {
                i += 1;
                format_id = Some(value_of(rest, i, "--format")?.to_string());
            }
            "--audio-only" => audio_only = true,
            "--template" => {
                i += 1;
                template = Some(value_of(rest, i, "--template")?.to_string());
            }
            "--dir" => {
                i += 1;
                dir = Some(value_of(rest, i, "--dir")?.to_string());
            }
            "--urls-file" => {
                i += 1;
                urls_file = Some(PathBuf::from(value_of(rest, i, "--urls-file")?));
            }
            "--archive" => archive = true,
            "--auto-archive" => {
                i += 1;
                auto_archive = Some(match value_of(rest, i, "--auto-archive")? {
                    "on" => true,
                    "off" => false,
                    other => return Err(format!("--auto-archive expects on|off, got {other}")),
                });
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown arg: {other} (try --help)"))
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    match name.as_str() {
        "info" => Ok(Command::Info {
            url: single_positional(&positional, "info <url>")?,
            filter,
            search,
            csv,
        }),
        "download" => Ok(Command::Download(DownloadRequest {
            url: single_positional(&positional, "download <url>")?,
            format_id,
            audio_only,
            output_template: template,
            target_dir: dir,
        })),
        "bulk" => Ok(Command::Bulk(BulkDownloadRequest {
            urls: positional.join("\n"),
            url_file: urls_file,
            target_dir: dir,
            format_id,
            audio_only,
            archive,
            output_template: template,
        })),
        "settings" => Ok(Command::Settings(SettingsUpdate {
            download_dir: dir,
            auto_archive_bulk: auto_archive,
        })),
        "link" => Ok(Command::Link(single_positional(&positional, "link <path>")?)),
        other => Err(format!("unknown command: {other} (try --help)")),
    }
}

fn run_info(
    client: &ApiClient,
    session: &mut Session,
    url: &str,
    filter: Option<FilterCategory>,
    search: Option<&str>,
    csv: bool,
) -> Result<(), String> {
    let ticket = session.begin(RequestKind::Info);
    session.apply_info(ticket, client.fetch_info(url));
    report(session, Panel::Single)?;

    if let Some(view) = session.info_view() {
        println!("{}", view.title);
        for line in [&view.uploader_line, &view.duration_line] {
            if !line.is_empty() {
                println!("{line}");
            }
        }
        if let Some(thumb) = &view.thumbnail_url {
            println!("Thumbnail: {thumb}");
        }
        if !view.description.is_empty() {
            println!("\n{}\n", view.description);
        }
    }

    let options = session.catalog().selection_options();
    let catalog = session.catalog_mut();
    if let Some(f) = filter {
        catalog.set_filter(f);
    }
    if let Some(s) = search {
        catalog.set_search(s);
    }
    let view = catalog.query_view();

    if csv {
        display::write_table_csv(&view.records, std::io::stdout()).map_err(|e| e.to_string())?;
        return Ok(());
    }

    if view.widened {
        println!("No recommended formats; showing all.");
    }
    println!("Filter: {} ({} formats)", view.filter, view.records.len());
    print!("{}", display::render_table(&view.records));

    println!("\nQuality choices:");
    for option in options {
        println!("  {}", option.label);
    }
    Ok(())
}

/// Prints the panel status and its links; an error status fails the run.
fn report(session: &Session, panel: Panel) -> Result<(), String> {
    let status = session.ui().status(panel);
    if status.kind == StatusKind::Error {
        return Err(status.message.clone());
    }
    println!("{}", status.message);
    for link in &status.links {
        println!("  {} -> {}", link.file, link.href);
    }
    Ok(())
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn single_positional(positional: &[String], usage: &str) -> Result<String, String> {
    match positional {
        [one] => Ok(one.clone()),
        _ => Err(format!("usage: downloader_cli {usage}")),
    }
}

fn print_help() {
    println!(
        r#"downloader_cli

Talks to a running downloader backend: inspects formats, downloads single
URLs or batches, and reads or changes server settings.

Usage:
  downloader_cli [--server URL] [--base-dir DIR] info <url> [--filter F] [--search S] [--csv]
  downloader_cli [--server URL] [--base-dir DIR] download <url> [--format ID] [--audio-only] [--template T] [--dir D]
  downloader_cli [--server URL] [--base-dir DIR] bulk [--urls-file FILE] [--archive] [--audio-only] [--format ID] [--template T] [--dir D] [URL...]
  downloader_cli [--server URL] [--base-dir DIR] settings [--dir D] [--auto-archive on|off]
  downloader_cli [--server URL] [--base-dir DIR] link <path>

Options:
  --server <url>        Backend base URL (default: $DOWNLOADER_WEB_SERVER or http://127.0.0.1:5000)
  --base-dir <path>     Config and activity log dir (default: $DOWNLOADER_WEB_BASE_DIR or platform data dir)
  --filter <name>       recommended | video | audio | other | all
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn help_flag_after_command_is_a_value() {
        let args = argv(&["downloader_cli", "info", "https://m.example/1", "--search", "-h"]);
        let global = parse_global(&args).expect("global");
        assert!(!global.help);
        assert_eq!(global.command_start, 1);

        match parse_command(&args[global.command_start..]).expect("command") {
            Command::Info { url, search, .. } => {
                assert_eq!(url, "https://m.example/1");
                assert_eq!(search.as_deref(), Some("-h"));
            }
            _ => panic!("expected info command"),
        }
    }

    #[test]
    fn help_before_command_or_missing_command_prints_help() {
        assert!(parse_global(&argv(&["downloader_cli", "--help", "info", "u"])).expect("global").help);
        assert!(parse_global(&argv(&["downloader_cli"])).expect("global").help);

        let global = parse_global(&argv(&["downloader_cli", "--server", "http://h:1", "link", "/a"]))
            .expect("global");
        assert!(!global.help);
        assert_eq!(global.server.as_deref(), Some("http://h:1"));
        assert_eq!(global.command_start, 3);
    }
}
