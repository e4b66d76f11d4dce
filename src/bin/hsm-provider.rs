use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::debug;

use hsm_crypto_provider::model::{
    CryptoContext, CryptoHashParameter, CryptoIdentifier, CryptoKeyParameter, HashAlgorithm,
    KeyType,
};
use hsm_crypto_provider::{CryptoProvider, HsmConfig, HsmController, HsmCryptoProvider};

#[derive(Parser, Debug)]
#[command(name = "hsm-provider")]
#[command(about = "Crypto provider operations on a PKCS#11 token", version)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Path of the PKCS#11 module
    #[arg(long, env = "CRYPTO_EXECUTABLE_PATH", global = true)]
    pub module_path: Option<PathBuf>,

    /// Label of the token (partition)
    #[arg(long, env = "HSM_PARTITION_LABEL", global = true)]
    pub token_label: Option<String>,

    /// User PIN of the token
    #[arg(long, env = "HSM_PARTITION_PASSWORD", hide_env_values = true, global = true)]
    pub pin: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a key on the token
    Generate {
        #[arg(long)]
        key_id: String,

        /// Key type, e.g. ecdsa-p256, rsa-2048, aes256gcm
        #[arg(long, default_value = "ecdsa-p256")]
        key_type: String,
    },

    /// Print the public key (hex) and key type of a key pair
    GetKey {
        #[arg(long)]
        key_id: String,
    },

    /// Sign data provided via stdin, as given; prints the signature in hex
    Sign {
        #[arg(long)]
        key_id: String,
    },

    /// Verify a hex signature over data provided via stdin
    Verify {
        #[arg(long)]
        key_id: String,

        #[arg(long)]
        signature: String,
    },

    /// Encrypt data provided via stdin; prints the ciphertext in hex
    Encrypt {
        #[arg(long)]
        key_id: String,
    },

    /// Decrypt hex ciphertext provided via stdin; writes the plaintext to stdout
    Decrypt {
        #[arg(long)]
        key_id: String,
    },

    /// Print random bytes from the token in hex
    Random {
        #[arg(long, default_value_t = 32)]
        length: usize,
    },

    /// SHA-256 of data provided via stdin
    Hash,

    /// Print a base64 seed
    Seed,

    /// Check whether a key pair exists
    Exists {
        #[arg(long)]
        key_id: String,
    },

    /// List supported key and hash algorithms
    Algorithms,
}

fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(io::stderr)
        .init();

    let config = HsmConfig::from_parts(cli.module_path, cli.token_label, cli.pin)?;
    debug!(?config, "Connecting to token");
    let controller = HsmController::connect(config).context("failed to open token session")?;
    let provider = HsmCryptoProvider::new(controller);

    match cli.command {
        Commands::Generate { key_id, key_type } => {
            let parameter = CryptoKeyParameter {
                key_type: KeyType::new(key_type),
                identifier: CryptoIdentifier::new(key_id),
            };
            provider
                .generate_key(&parameter)
                .with_context(|| format!("failed to generate {} key", parameter.key_type))?;
            println!("{}", parameter.identifier.key_id);
        }
        Commands::GetKey { key_id } => {
            let key = provider.get_key(&CryptoIdentifier::new(key_id))?;
            println!("{}", key.parameter.key_type);
            println!("{}", hex::encode(key.key));
        }
        Commands::Sign { key_id } => {
            let data = read_stdin()?;
            let signature = provider.sign(&CryptoIdentifier::new(key_id), &data)?;
            println!("{}", hex::encode(signature));
        }
        Commands::Verify { key_id, signature } => {
            let signature = hex::decode(signature.trim())
                .map_err(|e| anyhow::anyhow!("Invalid signature hex: {}", e))?;
            let data = read_stdin()?;
            let valid = provider.verify(&CryptoIdentifier::new(key_id), &data, &signature)?;
            println!("{}", if valid { "valid" } else { "invalid" });
            if !valid {
                std::process::exit(1);
            }
        }
        Commands::Encrypt { key_id } => {
            let data = read_stdin()?;
            let ciphertext = provider.encrypt(&CryptoIdentifier::new(key_id), &data)?;
            println!("{}", hex::encode(ciphertext));
        }
        Commands::Decrypt { key_id } => {
            let input = read_stdin()?;
            let ciphertext = hex::decode(String::from_utf8_lossy(&input).trim())
                .map_err(|e| anyhow::anyhow!("Invalid ciphertext hex: {}", e))?;
            let plaintext = provider.decrypt(&CryptoIdentifier::new(key_id), &ciphertext)?;
            io::stdout().write_all(&plaintext)?;
        }
        Commands::Random { length } => {
            let random = provider.generate_random(&CryptoContext::default(), length)?;
            println!("{}", hex::encode(random));
        }
        Commands::Hash => {
            let data = read_stdin()?;
            let digest =
                provider.hash(&CryptoHashParameter::new(HashAlgorithm::Sha2256), &data)?;
            println!("{}", hex::encode(digest));
        }
        Commands::Seed => {
            println!("{}", provider.get_seed());
        }
        Commands::Exists { key_id } => {
            match provider.is_key_existing(&CryptoIdentifier::new(key_id)) {
                Ok(exists) => println!("{exists}"),
                Err(e) if e.is_not_found() => println!("false"),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Algorithms => {
            for key_type in provider.get_supported_keys_algs() {
                println!("{key_type}");
            }
            for hash in provider.get_supported_hash_algs() {
                println!("{hash}");
            }
        }
    }

    Ok(())
}
