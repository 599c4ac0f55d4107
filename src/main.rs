use std::collections::HashMap;
use std::env;
use std::process;

use bool_expr::error::{self, ExpressionError};

const USAGE: &str = "usage: bool_expr '<expression>' [name=value ...]";

fn main() {
    let args: Vec<_> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        process::exit(2);
    }

    let variables = match bindings(&args[2..]) {
        Ok(variables) => variables,
        Err(argument) => {
            eprintln!("invalid variable binding {:?}, expected name=value\n{}", argument, USAGE);
            process::exit(2);
        }
    };

    match run(&args[1], &variables, true) {
        Ok(result) => println!("{}", result),
        Err(_) => process::exit(1),
    }
}

/// Splits `name=value` arguments. The value may itself contain `=`.
fn bindings(args: &[String]) -> Result<HashMap<&str, &str>, &str> {
    args.iter()
        .map(|arg| arg.split_once('=').filter(|(name, _)| !name.is_empty()).ok_or(arg.as_str()))
        .collect()
}

pub fn run(source: &str, variables: &HashMap<&str, &str>, print_error: bool) -> Result<bool, ExpressionError> {
    let result = bool_expr::parse(source, None).and_then(|expression| expression.evaluate(variables));

    if let Err(err) = &result {
        if print_error {
            // nothing left to report to if stderr is gone
            let _ = error::print_error(source, err);
        }
    }

    result
}
