use crate::cli::Session;
use crate::color::compatibility_label;
use crate::{die, CheckArgs};

/// Exit status when the combination cannot run the model.
const NOT_COMPATIBLE_EXIT_CODE: i32 = 2;

pub(crate) async fn check_cmd(session: &Session, args: &CheckArgs) {
    let engine = session.engine(args.engine.as_deref());
    let device = session.device_architecture(args.device);

    let check = match session
        .resolver
        .check_compatibility(&args.architecture, device, &engine, args.engine_version.as_deref())
        .await
    {
        Ok(check) => check,
        Err(err) => die!("failed to check compatibility: {}", err),
    };

    let target = match &args.engine_version {
        Some(version) => format!("{} {} on {}", engine, version, device),
        None => format!("{} (latest) on {}", engine, device),
    };

    if check.compatible {
        println!(
            "{} {} runs {}",
            compatibility_label(true),
            target,
            args.architecture
        );
    } else {
        println!(
            "{} {} does not run {}",
            compatibility_label(false),
            target,
            args.architecture
        );

        std::process::exit(NOT_COMPATIBLE_EXIT_CODE);
    }
}
