use anyhow::bail;

use crate::{args::IlCliArgs, Context};

mod build;
mod test_all;

impl Context {
    /// Dispatches the parsed arguments; the returned value is the process
    /// exit code (0 on success, 1 on any failure).
    pub fn execute(&mut self, args: IlCliArgs) -> Result<i32, anyhow::Error> {
        if args.test_all {
            return self.execute_test_all(&args);
        }
        match &args.input {
            Some(input) => self.execute_build(input.clone(), &args),
            None => bail!("no input file given (see --help)"),
        }
    }
}
