/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 11/10/2026
Last Modified: 17/10/2026
License: MIT
*/

/*!
ShapeStore is a command-line program for inspecting, querying and creating
ESRI Shapefiles. The following commands are recognized:

| Command           | Description                                                                    |
| ----------------- | ------------------------------------------------------------------------------ |
| --create          | Creates an empty Shapefile; used with --shape_type and optionally --fields.     |
| --bbox            | The query box for --query, as "xmin,ymin,xmax,ymax".                            |
| --fields          | Attribute fields for --create, e.g. --fields="NAME:C:20,AREA:N:12:2".          |
| -h, --help        | Prints help information.                                                       |
| --info            | Prints the header, feature count, extent and fields of a Shapefile.            |
| --json            | Prints --info output as JSON.                                                  |
| --query           | Prints the features whose bounding boxes overlap --bbox.                       |
| --rebuild_index   | Rebuilds and saves the spatial index (.sidx) of a Shapefile.                   |
| --settings        | Prints the settings read from settings.json.                                   |
| --shape_type      | The shape type for --create: Point, PolyLine, Polygon or MultiPoint.           |
| -v                | Verbose mode.                                                                  |
| --version         | Prints the version information.                                                |
*/

use shapestore_common::configs::{get_configs, Configs};
use shapestore_common::error::{Result, ShapeError};
use shapestore_common::structures::BoundingBox;
use shapestore_common::utils::get_formatted_elapsed_time;
use shapestore_vector::{DbaseField, FieldType, ShapeFileProvider, ShapeType};
use std::env;
use std::process;
use std::time::Instant;
use tracing::{debug, Level};

enum Command {
    Help,
    Info(String),
    Query(String),
    RebuildIndex(String),
    Create(String),
    Settings,
    Version,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        version();
        help();
        return Ok(());
    }

    let mut configs = get_configs()?;
    let mut command = Command::Help;
    let mut bbox: Option<BoundingBox> = None;
    let mut shape_type = ShapeType::Polygon;
    let mut fields: Vec<DbaseField> = vec![];
    let mut as_json = false;

    for arg in &args {
        let flag_val = arg.to_lowercase().replace("--", "-");
        if flag_val == "-h" || flag_val == "-help" {
            command = Command::Help;
            break;
        } else if flag_val.starts_with("-version") {
            command = Command::Version;
            break;
        } else if flag_val.starts_with("-info") {
            command = Command::Info(flag_value(arg, "info"));
        } else if flag_val.starts_with("-query") {
            command = Command::Query(flag_value(arg, "query"));
        } else if flag_val.starts_with("-rebuild_index") {
            command = Command::RebuildIndex(flag_value(arg, "rebuild_index"));
        } else if flag_val.starts_with("-create") {
            command = Command::Create(flag_value(arg, "create"));
        } else if flag_val.starts_with("-settings") {
            command = Command::Settings;
        } else if flag_val.starts_with("-bbox") {
            bbox = Some(parse_bbox(&flag_value(arg, "bbox"))?);
        } else if flag_val.starts_with("-shape_type") {
            let v = flag_value(arg, "shape_type");
            shape_type = v.parse::<ShapeType>()?;
        } else if flag_val.starts_with("-fields") {
            fields = parse_fields(&flag_value(arg, "fields"))?;
        } else if flag_val.starts_with("-json") {
            as_json = true;
        } else if flag_val == "-v" || flag_val.starts_with("-verbose") {
            configs.verbose_mode = true;
        } else {
            return Err(ShapeError::InvalidOperation(format!(
                "unrecognized argument {}; use --help for a list of commands",
                arg
            )));
        }
    }

    let level = if configs.verbose_mode {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let start = Instant::now();
    match command {
        Command::Help => help(),
        Command::Version => version(),
        Command::Settings => print_settings(&configs)?,
        Command::Info(file) => print_info(&file, configs, as_json)?,
        Command::Query(file) => {
            let bbox = bbox.ok_or_else(|| {
                ShapeError::InvalidOperation("--query requires --bbox=\"xmin,ymin,xmax,ymax\"".to_string())
            })?;
            run_query(&file, configs, bbox)?;
        }
        Command::RebuildIndex(file) => {
            let mut provider = ShapeFileProvider::new(&file, configs)?;
            provider.open(true)?;
            provider.rebuild_spatial_index()?;
            println!(
                "Rebuilt the spatial index of {} ({} features)",
                file,
                provider.get_feature_count()?
            );
            provider.close()?;
        }
        Command::Create(file) => {
            ShapeFileProvider::create(&file, shape_type, fields, configs)?;
            println!("Created {} ({})", file, shape_type);
        }
    }
    debug!("Elapsed time: {}", get_formatted_elapsed_time(start));
    Ok(())
}

/// Strips the leading dashes, the flag name (in any case), an `=` and any
/// quotes.
fn flag_value(arg: &str, name: &str) -> String {
    let mut v = arg.trim_start_matches('-');
    if let Some(prefix) = v.get(..name.len()) {
        if prefix.eq_ignore_ascii_case(name) {
            v = &v[name.len()..];
        }
    }
    let v = v.strip_prefix('=').unwrap_or(v);
    v.replace('\"', "").replace('\'', "").trim().to_string()
}

fn parse_bbox(s: &str) -> Result<BoundingBox> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| ShapeError::InvalidOperation(format!("bad --bbox value {}: {}", s, e)))?;
    if values.len() != 4 {
        return Err(ShapeError::InvalidOperation(format!(
            "--bbox needs four values (xmin,ymin,xmax,ymax), got {}",
            values.len()
        )));
    }
    Ok(BoundingBox::new(values[0], values[2], values[1], values[3]))
}

/// Parses `NAME:TYPE:LENGTH[:DECIMALS]` descriptors separated by commas.
fn parse_fields(s: &str) -> Result<Vec<DbaseField>> {
    let mut fields = vec![];
    for descriptor in s.split(',').filter(|d| !d.trim().is_empty()) {
        let parts: Vec<&str> = descriptor.trim().split(':').collect();
        let bad = || ShapeError::InvalidOperation(format!("bad field descriptor {}", descriptor));
        if parts.len() < 2 || parts.len() > 4 {
            return Err(bad());
        }
        let field_type = FieldType::from_char(parts[1].chars().next().ok_or_else(bad)?)?;
        let length = match parts.get(2) {
            Some(v) => v.parse::<u8>().map_err(|_| bad())?,
            None => 10,
        };
        let decimals = match parts.get(3) {
            Some(v) => v.parse::<u8>().map_err(|_| bad())?,
            None => 0,
        };
        fields.push(DbaseField::new(parts[0], field_type, length, decimals));
    }
    Ok(fields)
}

fn print_settings(configs: &Configs) -> Result<()> {
    let s = serde_json::to_string_pretty(configs)
        .map_err(|e| ShapeError::Config(e.to_string()))?;
    println!("{}", s);
    Ok(())
}

fn print_info(file: &str, configs: Configs, as_json: bool) -> Result<()> {
    let mut provider = ShapeFileProvider::new(file, configs)?;
    provider.open(false)?;
    let extent = provider.get_extents()?;
    let count = provider.get_feature_count()?;
    let fields = provider.fields()?;
    if as_json {
        let field_list: Vec<serde_json::Value> = fields
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "type": f.field_type.to_char().to_string(),
                    "length": f.length,
                    "decimals": f.decimals,
                })
            })
            .collect();
        let info = serde_json::json!({
            "file": file,
            "shape_type": provider.shape_type()?.to_string(),
            "feature_count": count,
            "extent": [extent.min_x, extent.min_y, extent.max_x, extent.max_y],
            "fields": field_list,
            "projection": provider.projection()?,
        });
        let s = serde_json::to_string_pretty(&info)
            .map_err(|e| ShapeError::Config(e.to_string()))?;
        println!("{}", s);
    } else {
        println!("{}", provider.header()?);
        println!("Features: {}", count);
        println!("Extent: {}", extent);
        println!("Fields:");
        for f in fields {
            println!(
                "  {} ({}, {}, {})",
                f.name,
                f.field_type.to_char(),
                f.length,
                f.decimals
            );
        }
        if let Some(wkt) = provider.projection()? {
            println!("Projection: {}", wkt);
        }
    }
    provider.close()
}

fn run_query(file: &str, configs: Configs, bbox: BoundingBox) -> Result<()> {
    let mut provider = ShapeFileProvider::new(file, configs)?;
    provider.open(false)?;
    let mut num_found = 0;
    for feature in provider.execute_intersection_query(&bbox)? {
        println!("{}", feature?);
        num_found += 1;
    }
    println!("{} features found", num_found);
    provider.close()
}

fn help() {
    let mut ext = "";
    if cfg!(target_os = "windows") {
        ext = ".exe";
    }
    let exe_name = &format!("shapestore{}", ext);
    let s = "ShapeStore Help

The following commands are recognized:
--create            Creates an empty Shapefile; e.g. --create=lakes.shp --shape_type=Polygon
--bbox              The query box for --query, as \"xmin,ymin,xmax,ymax\".
--fields            Attribute fields for --create, e.g. --fields=\"NAME:C:20,AREA:N:12:2\"
-h, --help          Prints help information.
--info              Prints the header, feature count, extent and fields of a Shapefile.
--json              Prints --info output as JSON.
--query             Prints the features overlapping --bbox; e.g. --query=lakes.shp --bbox=\"0,0,10,10\"
--rebuild_index     Rebuilds and saves the spatial index of a Shapefile.
--settings          Prints the settings read from settings.json.
--shape_type        Point, PolyLine, Polygon or MultiPoint.
-v                  Verbose mode.
--version           Prints the version information.

Example Usage:
>> EXE_NAME --query=lakes.shp --bbox=\"-80.5,43.2,-80.1,43.6\" -v
"
    .replace("EXE_NAME", exe_name);
    println!("{}", s);
}

fn version() {
    const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
    println!(
        "ShapeStore v{} by Dr. John B. Lindsay (c) 2026",
        VERSION.unwrap_or("unknown")
    );
}
