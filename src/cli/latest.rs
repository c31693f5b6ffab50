use crate::cli::output::{
    format_output,
    table::{or_none, Table},
};
use crate::cli::Session;
use crate::die;
use crate::resolver::LatestEngineVersion;
use crate::LatestArgs;

impl From<LatestEngineVersion> for Table {
    fn from(value: LatestEngineVersion) -> Self {
        let mut tab = Table::new(vec![
            "ENGINE",
            "VERSION",
            "DEVICE",
            "IMAGE",
            "CREATED",
            "ARCHITECTURES",
            "FEATURES",
        ]);

        let join = |names: Vec<String>| {
            if names.is_empty() {
                or_none(None)
            } else {
                names.join(",")
            }
        };

        let architectures = value
            .compatibilities
            .iter()
            .flat_map(|record| record.architectures.iter())
            .map(|entry| entry.name.clone())
            .collect();

        let features = value
            .compatibilities
            .iter()
            .flat_map(|record| record.features.iter())
            .map(|entry| entry.name.clone())
            .collect();

        tab.add_row(vec![
            value.engine,
            value.version,
            value.device_architecture.to_string(),
            value.container_image,
            value.created_at.format("%Y-%m-%d").to_string(),
            join(architectures),
            join(features),
        ]);

        tab
    }
}

pub(crate) async fn latest_cmd(session: &Session, args: &LatestArgs) {
    let engine = session.engine(args.engine.as_deref());
    let device = session.device_architecture(args.device);

    let latest = match session.resolver.latest_engine_version(device, &engine).await {
        Ok(Some(latest)) => latest,
        Ok(None) => die!("no {} version found for {}", engine, device),
        Err(err) => die!("failed to look up the latest version: {}", err),
    };

    format_output(latest, args.format);
}
