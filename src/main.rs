use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wavcomp::crypto::{CipherKey, EncryptionKind};
use wavcomp::wavefile::{CompressionChoice, PackOptions, PackOutcome, WaveFile};
use wavcomp::{CompressionKind, WaveInfo};

#[derive(Parser)]
#[command(name = "wavcomp", version, about = "Compress and encrypt WAVE audio in place of its sample data")]
struct Cli {
    /// Input WAVE file (plain or packed)
    input: PathBuf,
    /// Output file; without it only the header summary is printed
    output: Option<PathBuf>,
    /// Compression: none, gzip, lzma, bzip2 (default), flac, best
    #[arg(short, long)]
    compression: Option<String>,
    /// Encryption: none, aes (default aes when key material is given)
    #[arg(short, long)]
    encryption: Option<String>,
    /// Print the header summary and stop
    #[arg(short, long)]
    info: bool,
    /// Print the header summary as JSON
    #[arg(long)]
    json: bool,
    /// Compression level (gzip 0-9, bzip2 1-9; ignored for lzma/flac)
    #[arg(short, long, default_value = "6")]
    level: i32,
    /// Derive the AES key from a password (Argon2id)
    #[arg(long, conflicts_with_all = ["key", "legacy_key"])]
    password: Option<String>,
    /// AES-256 key as 64 hex digits
    #[arg(long, requires = "iv", conflicts_with = "legacy_key")]
    key: Option<String>,
    /// CBC IV as 32 hex digits
    #[arg(long, requires = "key")]
    iv: Option<String>,
    /// Use the fixed key of the legacy format
    #[arg(long)]
    legacy_key: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let key = cipher_key(&cli)?;

    let wav = WaveFile::open(&cli.input, key.clone())?;
    let info = wav.info();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_info(&cli.input, &info);
    }

    let output = match (&cli.output, cli.info) {
        (Some(output), false) => output,
        _ => return Ok(()),
    };

    let pack = !wav.wave().is_packed() || cli.compression.is_some() || cli.encryption.is_some();
    if !pack {
        let bytes = wav.unpack_to(output)?;
        println!("Unpacked → {} ({} B)", output.display(), bytes);
        return Ok(());
    }

    let compression = match &cli.compression {
        Some(token) => CompressionChoice::from_name(token)
            .ok_or_else(|| format!("unknown compression '{token}'"))?,
        None => CompressionChoice::default(),
    };
    let encryption = match &cli.encryption {
        Some(token) => EncryptionKind::from_name(token)
            .ok_or_else(|| format!("unknown encryption '{token}'"))?,
        None if key.is_some() => EncryptionKind::Aes,
        None => {
            warn!("no key material given, writing unencrypted");
            EncryptionKind::Unencrypted
        }
    };
    if encryption == EncryptionKind::Aes && key.is_none() {
        return Err("AES needs --password, --key/--iv or --legacy-key".into());
    }

    let opts = PackOptions { compression, encryption, level: cli.level, key };
    match wav.pack_to(output, &opts)? {
        PackOutcome::Packed { compression, encryption, bytes } => {
            let ratio = bytes as f64 / wav.wave().plain_len().max(1) as f64;
            println!(
                "Packed → {} ({} B, {}/{}, {:.1}% of plain)",
                output.display(), bytes, compression, encryption, ratio * 100.0
            );
        }
        PackOutcome::NoImprovement => {
            println!("No compression beats the plain size; nothing written");
        }
    }
    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn cipher_key(cli: &Cli) -> Result<Option<CipherKey>, Box<dyn std::error::Error>> {
    if let Some(password) = &cli.password {
        return Ok(Some(CipherKey::derive(password)?));
    }
    if let (Some(key), Some(iv)) = (&cli.key, &cli.iv) {
        return Ok(Some(CipherKey::from_hex(key, iv)?));
    }
    if cli.legacy_key {
        return Ok(Some(CipherKey::legacy()));
    }
    Ok(None)
}

fn print_info(path: &Path, info: &WaveInfo) {
    println!("── WAVE ─────────────────────────────────────────────────");
    println!("  Path           {}", path.display());
    println!("  Format         {}", info.format_name());
    println!("  Channels       {}", info.channels);
    println!("  Sample rate    {} Hz", info.sample_rate);
    println!("  Bits/sample    {}", info.bits_per_sample);
    println!("  Samples        {}", info.sample_count);
    println!("  Duration       {:.3} s", info.duration_secs);
    let packed = info.compression != CompressionKind::Uncompressed.name()
        || info.encryption != EncryptionKind::Unencrypted.name();
    if packed {
        println!("  Compression    {}", info.compression);
        println!("  Encryption     {}", info.encryption);
    }
    if !info.extra_chunks.is_empty() {
        println!("  Extra chunks   {}", info.extra_chunks.join(", "));
    }
    if let Some(size) = info.file_size {
        println!("  File size      {} B", size);
    }
    println!("  PCM BLAKE3     {}", &info.pcm_blake3[..16]);
}
