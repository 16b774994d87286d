use std::io::Write;
use std::process::ExitCode;

use evmil::{
    evm::dialect::Dialect,
    opt,
    utils::{cli, diagnostics::Diagnostic},
    CompileError,
};

fn get_writer(output: &Option<std::path::PathBuf>) -> Box<dyn std::io::Write> {
    match output {
        Some(path) => Box::new(std::fs::File::create(path.as_path()).expect("cannot open output")),
        None => Box::new(std::io::stdout()),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = cli::parse();

    let content = match std::fs::read_to_string(&args.input) {
        Ok(content) => content,
        Err(error) => {
            Diagnostic::error(format!("cannot read {}: {}", args.input.display(), error))
                .write(&mut std::io::stderr())
                .expect("cannot write diagnostics");
            return ExitCode::FAILURE;
        }
    };
    let filename = args.input.to_string_lossy();

    let dialect = if args.object_access {
        Dialect::evm_with_object_access()
    } else {
        Dialect::evm()
    };
    let mut writer = get_writer(&args.output);

    let result = match args.action {
        cli::Action::Scan => main_scan(&filename, &content, &mut writer),
        cli::Action::Parse => main_parse(&filename, &content, &dialect, &mut writer),
        cli::Action::Optimize => main_optimize(&filename, &content, &dialect, &args, &mut writer),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let diagnostic = match &error {
                CompileError::Scan(error) => Diagnostic::from(error),
                CompileError::Parse(error) => Diagnostic::from(error),
            };
            diagnostic
                .write(&mut std::io::stderr())
                .expect("cannot write diagnostics");
            ExitCode::FAILURE
        }
    }
}

fn main_scan(
    filename: &str,
    content: &str,
    writer: &mut dyn std::io::Write,
) -> Result<(), CompileError> {
    for token in evmil::scan_source(filename, content)? {
        let (line, _) = token.span.source.position(token.span.start);
        writeln!(writer, "{} {}", line, token.token).expect("cannot write output");
    }
    Ok(())
}

fn main_parse(
    filename: &str,
    content: &str,
    dialect: &Dialect,
    writer: &mut dyn std::io::Write,
) -> Result<(), CompileError> {
    let ast = evmil::parse_source(filename, content, dialect)?;
    writeln!(writer, "{}", ast).expect("cannot write output");
    Ok(())
}

fn main_optimize(
    filename: &str,
    content: &str,
    dialect: &Dialect,
    args: &cli::Args,
    writer: &mut dyn std::io::Write,
) -> Result<(), CompileError> {
    let mut ast = evmil::parse_source(filename, content, dialect)?;
    let optimizations = if args.opt.is_empty() {
        vec![cli::Optimization::All]
    } else {
        args.opt.clone()
    };
    opt::optimize(dialect, &mut ast, &optimizations);
    writeln!(writer, "{}", ast).expect("cannot write output");
    Ok(())
}
