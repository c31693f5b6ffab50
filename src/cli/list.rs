use strum::IntoEnumIterator;

use crate::catalog::{ArchitectureClass, DeviceArchitecture, ModelInfo};
use crate::cli::output::{
    format_output,
    table::{or_none, yes_no, Table},
};
use crate::cli::Session;
use crate::die;
use crate::store::{self, CatalogSnapshot};
use crate::{ListArgs, ListObject};

#[derive(serde::Serialize)]
struct EngineBuild {
    engine: String,
    version: String,
    device_architecture: DeviceArchitecture,
    container_image: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Vec<EngineBuild>> for Table {
    fn from(value: Vec<EngineBuild>) -> Self {
        let mut tab = Table::new(vec!["ENGINE", "VERSION", "DEVICE", "IMAGE", "CREATED"]);

        for build in value {
            tab.add_row(vec![
                build.engine,
                build.version,
                build.device_architecture.to_string(),
                build.container_image,
                build.created_at.format("%Y-%m-%d").to_string(),
            ]);
        }

        tab
    }
}

impl From<Vec<ArchitectureClass>> for Table {
    fn from(value: Vec<ArchitectureClass>) -> Self {
        let mut tab = Table::new(vec![
            "CLASS",
            "FAMILY",
            "TOOL_PARSER",
            "REASONING_PARSER",
            "LORA",
            "PP",
        ]);

        for class in value {
            tab.add_row(vec![
                class.class_name,
                or_none(Some(class.architecture_family.as_str())),
                or_none(class.tool_calling_parser_type.as_deref()),
                or_none(class.reasoning_parser_type.as_deref()),
                yes_no(class.supports_lora),
                yes_no(class.supports_pipeline_parallelism),
            ]);
        }

        tab
    }
}

impl From<Vec<ModelInfo>> for Table {
    fn from(value: Vec<ModelInfo>) -> Self {
        let mut tab = Table::new(vec![
            "MODEL",
            "CLASS",
            "TOOL_PARSER",
            "CHAT_TEMPLATE",
            "ENDPOINTS",
        ]);

        for model in value {
            let endpoints: Vec<String> = model.endpoints.iter().map(|ep| ep.to_string()).collect();

            tab.add_row(vec![
                model.uri,
                or_none(model.architecture_class.as_deref()),
                or_none(model.tool_calling_parser_type.as_deref()),
                or_none(model.chat_template.as_deref()),
                or_none(Some(endpoints.join(",").as_str())),
            ]);
        }

        tab
    }
}

/// Every engine build, grouped by engine and device, newest first.
async fn engine_builds(snapshot: &dyn CatalogSnapshot) -> Result<Vec<EngineBuild>, store::Error> {
    let mut builds = Vec::new();

    for engine in snapshot.engines().await? {
        for device in DeviceArchitecture::iter() {
            let mut versions = snapshot.engine_versions(engine.id, device, None).await?;

            versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            builds.extend(versions.into_iter().map(|version| EngineBuild {
                engine: engine.name.clone(),
                version: version.version,
                device_architecture: version.device_architecture,
                container_image: version.container_image,
                created_at: version.created_at,
            }));
        }
    }

    Ok(builds)
}

pub(crate) async fn list_cmd(session: &Session, args: &ListArgs) {
    let format = args.format;

    let snapshot = match session.store.begin().await {
        Ok(snapshot) => snapshot,
        Err(err) => die!("failed to read the catalog: {}", err),
    };

    match &args.object {
        ListObject::Engines => match engine_builds(snapshot.as_ref()).await {
            Ok(builds) => format_output(builds, format),
            Err(err) => die!("failed to list engines: {}", err),
        },
        ListObject::Architectures => match snapshot.architecture_classes().await {
            Ok(classes) => format_output(classes, format),
            Err(err) => die!("failed to list architecture classes: {}", err),
        },
        ListObject::Models => match snapshot.models().await {
            Ok(models) => format_output(models, format),
            Err(err) => die!("failed to list models: {}", err),
        },
    }
}
