use jiffle::{
    diagnostics, EvaluationModel, ImageRole, Jiffle, JiffleContext, JiffleError, JiffleOptions,
};
use std::{env, process};
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "Usage: jiffle [check|source] <script> --src NAME --dest NAME \
[--model direct|indirect] [--docs] [--config FILE]";

struct Args {
    command: String,
    script: String,
    params: Vec<(String, ImageRole)>,
    model: EvaluationModel,
    docs: bool,
    config: Option<String>,
}

fn main() {
    init_logging();

    let args = match parse_args(env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            process::exit(1);
        }
    };

    let options = match &args.config {
        Some(path) => match JiffleOptions::from_toml_file(path) {
            Ok(options) => options,
            Err(err) => {
                eprintln!("{err}");
                process::exit(1);
            }
        },
        None => JiffleOptions::default(),
    };
    let context = JiffleContext::with_options(options);
    let mut jiffle = Jiffle::new(&context);

    if let Err(err) = jiffle.set_script_file(&args.script) {
        eprintln!("{err}");
        process::exit(1);
    }
    jiffle.set_image_params(args.params.clone());
    jiffle.set_name(args.script.clone());

    if let Err(err) = jiffle.compile() {
        report(&jiffle, &err);
        process::exit(1);
    }
    for warning in diagnostics::warning_reports(jiffle.name(), jiffle.script(), jiffle.diagnostics()) {
        eprintln!("{warning:?}");
    }

    match args.command.as_str() {
        "check" => println!("{}: ok", jiffle.name()),
        "source" => match jiffle.get_generated_source(args.model, args.docs) {
            Ok(text) => print!("{text}"),
            Err(err) => {
                report(&jiffle, &err);
                process::exit(1);
            }
        },
        other => {
            eprintln!("Invalid command `{other}`.\n{USAGE}");
            process::exit(1);
        }
    }
}

fn report(jiffle: &Jiffle<'_>, err: &JiffleError) {
    diagnostics::emit_error(jiffle.name(), jiffle.script(), err);
}

fn parse_args(raw: Vec<String>) -> Result<Args, String> {
    let mut iter = raw.into_iter();
    let command = iter.next().ok_or("Missing command")?;
    let script = iter.next().ok_or("Missing script file")?;
    let mut args = Args {
        command,
        script,
        params: Vec::new(),
        model: EvaluationModel::Direct,
        docs: false,
        config: None,
    };

    while let Some(flag) = iter.next() {
        let mut value = || iter.next().ok_or(format!("Missing value for {flag}"));
        match flag.as_str() {
            "--src" => {
                for name in value()?.split(',') {
                    args.params.push((name.to_string(), ImageRole::Source));
                }
            }
            "--dest" => {
                for name in value()?.split(',') {
                    args.params.push((name.to_string(), ImageRole::Dest));
                }
            }
            "--model" => args.model = value()?.parse()?,
            "--config" => args.config = Some(value()?),
            "--docs" => args.docs = true,
            other => return Err(format!("Unknown option `{other}`")),
        }
    }
    Ok(args)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,jiffle=info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
