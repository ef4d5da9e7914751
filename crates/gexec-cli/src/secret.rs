use color_eyre::{eyre::eyre, Result};
use gexec_core::secret::{CipherError, FieldCipher};

use crate::{cli::SecretCommand, config, storage};

/// Execute a secret subcommand with the configured cipher.
pub fn handle(cmd: SecretCommand, config: &config::Config) -> Result<()> {
    let cipher = storage::cipher_from_config(config)?;

    match cmd {
        SecretCommand::Seal { text } => println!("{}", seal_text(&cipher, &text.join(" "))?),
        SecretCommand::Open { blob } => println!("{}", open_blob(&cipher, &blob)?),
    }

    Ok(())
}

fn seal_text(cipher: &dyn FieldCipher, text: &str) -> Result<String> {
    cipher
        .encrypt(text)
        .map_err(|e| eyre!("cannot seal secret: {e}"))
}

fn open_blob(cipher: &dyn FieldCipher, blob: &str) -> Result<String> {
    cipher.decrypt(blob.trim()).map_err(|err| match err {
        CipherError::WrongPassphrase => {
            eyre!("cannot open secret: wrong encryption passphrase, or the value was altered")
        }
        CipherError::MalformedCiphertext { reason } => {
            eyre!("cannot open secret: not a sealed value ({reason})")
        }
        other => eyre!("cannot open secret: {other}"),
    })
}

#[cfg(test)]
mod tests {
    use gexec_storage::EnvelopeCipher;

    use super::*;

    fn cipher(key: &str) -> EnvelopeCipher {
        EnvelopeCipher::from_config_value(key).expect("valid key")
    }

    #[test]
    fn sealed_text_opens_with_the_same_passphrase() {
        let cipher = cipher("0123456789abcdef");
        let sealed = seal_text(&cipher, "hunter2").expect("seal");
        assert_ne!(sealed, "hunter2");
        assert_eq!(open_blob(&cipher, &format!("{sealed}\n")).expect("open"), "hunter2");
    }

    #[test]
    fn wrong_passphrase_and_garbage_read_differently() {
        let sealed = seal_text(&cipher("0123456789abcdef"), "hunter2").expect("seal");

        let wrong = open_blob(&cipher("fedcba9876543210"), &sealed).expect_err("wrong key");
        assert!(wrong.to_string().contains("wrong encryption passphrase"));

        let garbage = open_blob(&cipher("0123456789abcdef"), "plain text").expect_err("garbage");
        assert!(garbage.to_string().contains("not a sealed value"));
    }
}
