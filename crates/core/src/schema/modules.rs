//! Standard module schemas.
//!
//! Field order in each `vec!` is the canonical display order.

use super::field::{FieldDescriptor as F, FieldKind as K, ServiceKind};
use super::ModuleSchema;

pub const LOG_LEVELS: &[&str] = &["debug", "info", "warning", "error", "critical"];

pub const THEMES: &[&str] = &["light", "dark"];

pub const ACTION_TYPES: &[&str] = &["copy", "move", "hardlink", "symlink"];

pub const CLEANARR_MODES: &[&str] = &["report", "move", "remove", "restore", "clear", "nothing"];

pub const NOHL_MODES: &[&str] = &["scan", "resolve"];

const ARR: &[ServiceKind] = &[ServiceKind::Radarr, ServiceKind::Sonarr];

const ALL_SERVICES: &[ServiceKind] = &[ServiceKind::Radarr, ServiceKind::Sonarr, ServiceKind::Plex];

fn log_level() -> F {
    F::new("log_level", "Log Level", K::dropdown(LOG_LEVELS)).required()
}

fn dry_run() -> F {
    F::new("dry_run", "Dry Run", K::Slider)
        .with_description("Report what would change without touching any files")
}

/// Return the canonical set of module schemas.
pub fn standard_modules() -> Vec<ModuleSchema> {
    vec![
        ModuleSchema::new(
            "main",
            "General",
            vec![
                log_level(),
                F::new("theme", "Theme", K::dropdown(THEMES)),
            ],
        ),
        ModuleSchema::new(
            "sync_gdrive",
            "Sync Google Drive",
            vec![
                log_level(),
                F::new("client_id", "Client ID", K::Text),
                F::new("client_secret", "Client Secret", K::Password),
                F::new("token", "Token", K::Json)
                    .with_description("OAuth token document produced by rclone"),
                F::new("gdrive_sa_location", "Service Account File", K::Text)
                    .with_placeholder("/config/sa.json"),
                F::new(
                    "gdrive_list",
                    "Drives",
                    K::complex_list(vec![
                        F::new("name", "Name", K::Text),
                        F::new("id", "Drive ID", K::Text).required(),
                        F::new("location", "Location", K::Dir).required(),
                    ]),
                ),
            ],
        ),
        ModuleSchema::new(
            "poster_renamerr",
            "Poster Renamerr",
            vec![
                log_level(),
                dry_run(),
                F::new("sync_posters", "Sync Posters", K::Slider),
                F::new("action_type", "Action Type", K::dropdown(ACTION_TYPES)).required(),
                F::new("asset_folders", "Asset Folders", K::Slider),
                F::new("print_only_renames", "Print Only Renames", K::Slider),
                F::new("run_border_replacerr", "Run Border Replacerr", K::Slider),
                F::new(
                    "incremental_border_replacerr",
                    "Incremental Border Replacerr",
                    K::Slider,
                ),
                F::new("source_dirs", "Source Directories", K::DirListDragDrop)
                    .required()
                    .with_description("Highest priority first"),
                F::new("destination_dir", "Destination Directory", K::Dir).required(),
                F::new("instances", "Instances", K::instances(ALL_SERVICES)).required(),
            ],
        )
        .handled_elsewhere(&["instances"]),
        ModuleSchema::new(
            "poster_cleanarr",
            "Poster Cleanarr",
            vec![
                log_level(),
                dry_run(),
                F::new("mode", "Mode", K::dropdown(CLEANARR_MODES)).required(),
                F::new("plex_path", "Plex Path", K::Dir),
                F::new("ignore_media", "Ignore Media", K::Textarea)
                    .with_placeholder("One title per line")
                    .one_per_line(),
                F::new("instances", "Instances", K::instances(&[ServiceKind::Plex])).required(),
            ],
        ),
        ModuleSchema::new(
            "border_replacerr",
            "Border Replacerr",
            vec![
                log_level(),
                dry_run(),
                F::new("source_dirs", "Source Directories", K::DirList).required(),
                F::new("destination_dir", "Destination Directory", K::Dir).required(),
                F::new("border_width", "Border Width", K::Number).with_placeholder("26"),
                F::new("skip", "Skip", K::Slider),
                F::new("border_colors", "Border Colors", K::ColorList),
                F::new("exclusion_list", "Exclusion List", K::Textarea).one_per_line(),
            ],
        ),
        ModuleSchema::new(
            "unmatched_assets",
            "Unmatched Assets",
            vec![
                log_level(),
                F::new("source_dirs", "Source Directories", K::DirList).required(),
                F::new("ignore_root_folders", "Ignore Root Folders", K::Textarea).one_per_line(),
                F::new("instances", "Instances", K::instances(ALL_SERVICES)).required(),
            ],
        ),
        ModuleSchema::new(
            "nohl",
            "No Hardlinks",
            vec![
                log_level(),
                dry_run(),
                F::new("searches", "Searches", K::Number),
                F::new("print_files", "Print Files", K::Slider),
                F::new("source_dirs", "Source Directories", K::mode_dir_list(NOHL_MODES))
                    .required(),
                F::new("exclude_profiles", "Exclude Profiles", K::Textarea).one_per_line(),
                F::new("instances", "Instances", K::instances(ARR)).required(),
            ],
        ),
        ModuleSchema::new(
            "labelarr",
            "Labelarr",
            vec![
                log_level(),
                dry_run(),
                F::new(
                    "mappings",
                    "Mappings",
                    K::complex_list(vec![
                        F::new("app_instance", "App Instance", K::Text).required(),
                        F::new("labels", "Labels", K::Text).required(),
                        F::new("plex_instances", "Plex Instances", K::Text),
                    ]),
                )
                .required(),
            ],
        ),
        ModuleSchema::new(
            "upgradinatorr",
            "Upgradinatorr",
            vec![
                log_level(),
                dry_run(),
                F::new(
                    "instances_list",
                    "Instances",
                    K::complex_list(vec![
                        F::new("instance", "Instance", K::Text).required(),
                        F::new("count", "Count", K::Number).required(),
                        F::new("tag_name", "Tag Name", K::Text).required(),
                        F::new("ignore_tag", "Ignore Tag", K::Text),
                        F::new("unattended", "Unattended", K::Slider),
                    ]),
                )
                .required(),
            ],
        ),
        ModuleSchema::new(
            "renameinatorr",
            "Renameinatorr",
            vec![
                log_level(),
                dry_run(),
                F::new("rename_folders", "Rename Folders", K::Slider),
                F::new("count", "Count", K::Number),
                F::new("tag_name", "Tag Name", K::Text),
                F::new("instances", "Instances", K::instances(ARR)).required(),
            ],
        ),
        ModuleSchema::new(
            "health_checkarr",
            "Health Checkarr",
            vec![
                log_level(),
                dry_run(),
                F::new("instances", "Instances", K::instances(ARR)).required(),
            ],
        ),
        ModuleSchema::new(
            "jduparr",
            "jDuparr",
            vec![
                log_level(),
                dry_run(),
                F::new("source_dirs", "Source Directories", K::DirList).required(),
            ],
        ),
    ]
}
