use std::{error::Error, ops::ControlFlow, time::Instant};

use epir_client::{DEFAULT_MMAX, DecryptionContext, Encryptor, PrivateKey, mg_default_path};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let path = mg_default_path()?;
    info!("Generating mG table of {} entries, to be saved @ {}", DEFAULT_MMAX, path.display());

    let started_at = Instant::now();
    let mut last_reported_percent = 0;

    let ctx = DecryptionContext::generate_with_progress(DEFAULT_MMAX, |num_points_computed| {
        let percent = num_points_computed * 100 / DEFAULT_MMAX;
        if percent >= last_reported_percent + 10 {
            info!("{}% of points computed, in {:?}", percent, started_at.elapsed());
            last_reported_percent = percent;
        }

        ControlFlow::Continue(())
    })?;

    ctx.save(&path)?;
    info!("Saved mG table, digest {:02x?}", ctx.digest());

    // Sanity check, largest decryptable message must round trip.
    let privkey = PrivateKey::generate()?;
    let cipher = privkey.encrypt(DEFAULT_MMAX as u64 - 1, None)?;
    assert_eq!(ctx.decrypt_cipher(&privkey, &cipher), Some(DEFAULT_MMAX as u32 - 1));

    Ok(())
}
