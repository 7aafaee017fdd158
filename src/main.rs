use clap::Parser;
use lockbox::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    lockbox::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Init { passphrase } => lockbox::cli::commands::init::execute(&cli, passphrase),
        Commands::Keys { ref action } => lockbox::cli::commands::keys::execute(&cli, action),
        Commands::Encrypt { ref key_id, ref io } => {
            lockbox::cli::commands::encrypt::execute(&cli, key_id, io)
        }
        Commands::Decrypt { ref io } => lockbox::cli::commands::decrypt::execute(&cli, io),
        Commands::ReEncrypt { ref key_id, ref io } => {
            lockbox::cli::commands::re_encrypt::execute(&cli, key_id, io)
        }
        Commands::GenerateDataKey { ref key_id } => {
            lockbox::cli::commands::data_key::execute(&cli, key_id)
        }
    };

    if let Err(e) = result {
        lockbox::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
