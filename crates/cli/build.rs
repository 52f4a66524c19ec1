use std::{env, fs, path::PathBuf};

use clap::{Arg, ArgAction, Command, arg, value_parser};

fn tag_arg() -> Arg {
    arg!(-t --tag <TAG> "Tag to attach (repeatable)").action(ArgAction::Append)
}

fn fetch_args(cmd: Command) -> Command {
    cmd.arg(arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = Command::new("readlater")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Save web pages to read later")
        .arg(
            arg!(--store <FILE> "Store file (default: <data dir>/readlater/store.json)")
                .global(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(fetch_args(
            Command::new("save")
                .about("Extract a page and save it")
                .arg(arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin"))
                .arg(tag_arg())
                .arg(arg!(--url <URL> "Page URL to save under (required for stdin)"))
                .arg(arg!(--endpoint <URL> "Chat-completion endpoint used for AI parsing")),
        ))
        .subcommand(
            Command::new("link")
                .about("Save a link without fetching it")
                .arg(arg!(<URL> "Link to save"))
                .arg(arg!(--title <TITLE> "Title to store (defaults to the URL)"))
                .arg(tag_arg()),
        )
        .subcommand(fetch_args(
            Command::new("extract")
                .about("Print what the extractor captures from a page, as JSON")
                .arg(arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin"))
                .arg(arg!(--url <URL> "Base URL for resolving image sources")),
        ))
        .subcommand(
            Command::new("list")
                .about("List saved items")
                .arg(arg!(-t --tag <TAG> "Only items with any of these tags").action(ArgAction::Append))
                .arg(arg!(--unread "Only unread items"))
                .arg(arg!(-s --search <TERM> "Case-insensitive search"))
                .arg(
                    arg!(--sort <ORDER> "Sort order")
                        .default_value("newest")
                        .value_parser(["newest", "oldest", "title"]),
                )
                .arg(arg!(-n --limit <NUM> "Maximum number of items"))
                .arg(arg!(--recent "Show only the most recent items"))
                .arg(arg!(--json "Print items as JSON")),
        )
        .subcommand(Command::new("read").about("Print an item's saved text and mark it read").arg(arg!(<ID>)))
        .subcommand(Command::new("toggle-read").about("Flip an item between read and unread").arg(arg!(<ID>)))
        .subcommand(
            Command::new("tag")
                .about("Replace an item's tags")
                .arg(arg!(<ID>))
                .arg(arg!([TAG] ... "New tags")),
        )
        .subcommand(Command::new("tags").about("List every tag in use"))
        .subcommand(Command::new("delete").about("Delete an item").arg(arg!(<ID>)))
        .subcommand(
            Command::new("settings")
                .about("Show or change settings")
                .arg(arg!(--"ai-parsing" <BOOL> "Send saves through the AI advisor").value_parser(value_parser!(bool)))
                .arg(arg!(--"dark-mode" <BOOL> "Reader dark mode").value_parser(value_parser!(bool)))
                .arg(arg!(--"api-key" <KEY> "API key for the advisor"))
                .arg(arg!(--model <MODEL> "Model name sent to the advisor")),
        );

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "readlater", &completions_dir).unwrap();
    }

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
