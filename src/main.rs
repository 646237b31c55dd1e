use shapefile_reader::{BoundingBox, Geometry, IdentityTransform, ShapefileStore};
use std::env;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <path-to-shapefile> [--extent <XMIN>,<YMIN>,<XMAX>,<YMAX>]",
            args[0]
        );
        std::process::exit(1);
    }

    let shp_path = &args[1];
    let mut extent: Option<BoundingBox> = None;
    // Parse --extent argument
    if let Some(extent_idx) = args.iter().position(|arg| arg == "--extent") {
        if let Some(extent_str) = args.get(extent_idx + 1) {
            let parts: Vec<f64> = extent_str
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect();
            if parts.len() == 4 {
                extent = Some(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]));
            } else {
                eprintln!("ERROR: Invalid extent format. Expected <XMIN>,<YMIN>,<XMAX>,<YMAX>");
                std::process::exit(1);
            }
        } else {
            eprintln!("ERROR: --extent flag requires an argument.");
            std::process::exit(1);
        }
    }

    println!("Reading shapefile: {}", shp_path);
    println!("{}", "=".repeat(60));

    let store = match ShapefileStore::open(shp_path, IdentityTransform) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("\nERROR: Failed to open shapefile");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("\nShapefile Information:");
    println!("  Shape type: {:?}", store.file_shape_type());
    println!("  Shapes: {}", store.num_shapes());
    let file_box = store.extent();
    println!(
        "  Extent: ({}, {}) - ({}, {})",
        file_box.x_min, file_box.y_min, file_box.x_max, file_box.y_max
    );
    println!(
        "  Columns: {}",
        store.attribute_table().column_names().join(", ")
    );

    let records = match extent {
        Some(query) => store.shapes_in_extent(&query),
        None => store.shapes(),
    };
    let records = match records {
        Ok(records) => records,
        Err(e) => {
            eprintln!("\nERROR: Failed to read records");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("\nRecords ({} matched):", records.len());
    for (i, record) in records.iter().take(10).enumerate() {
        let summary = match &record.geometry {
            Geometry::Null => "null".to_string(),
            Geometry::Point { x, y } => format!("point ({}, {})", x, y),
            Geometry::MultiPoint(points) => format!("multipoint, {} points", points.len()),
            Geometry::Path(subpaths) => format!(
                "path, {} parts, {} points",
                subpaths.len(),
                subpaths.iter().map(Vec::len).sum::<usize>()
            ),
        };
        let attrs: Vec<String> = record
            .attributes
            .iter()
            .map(|a| a.trim().to_string())
            .collect();
        println!("  {}. {} [{}]", i + 1, summary, attrs.join(" | "));
    }
    if records.len() > 10 {
        println!("  ... and {} more", records.len() - 10);
    }
}
