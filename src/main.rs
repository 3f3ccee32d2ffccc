use std::process::ExitCode;

fn main() -> ExitCode {
    match gitflow::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = match err.downcast_ref::<gitflow::core::error::GitFlowError>() {
                Some(gf_err) => gitflow::core::error::exit_code(gf_err),
                None => 1,
            };
            ExitCode::from(code as u8)
        }
    }
}
