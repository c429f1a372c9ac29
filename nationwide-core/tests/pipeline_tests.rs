mod common;

use calamine::{Data, Reader, open_workbook_auto};
use common::{create_inventory, create_reference, create_template, inventory_row};
use nationwide_core::reader::read_sheet_rows;
use nationwide_core::{BuildError, LocationDirectory, Pipeline, PipelineConfig};
use std::fs;
use std::path::Path;

fn test_config(root: &Path) -> PipelineConfig {
    let assets = root.join("assets");
    PipelineConfig {
        cache_path: assets.join("airport_code_map.bin"),
        reference_path: assets.join("Airport_Codes.xlsx"),
        reference_sheet: Some("Sheet1".to_string()),
        input_sheet: None,
        template_path: assets.join("nationwide_template.xlsx"),
        template_copy_path: assets.join("nationwide_template_copy.xlsx"),
        template_sheet: "Sheet1".to_string(),
        ledger_path: assets.join("airport_codes_to_update.csv"),
        msrp_min_len: 7,
    }
}

fn setup_assets(config: &PipelineConfig) -> anyhow::Result<()> {
    fs::create_dir_all(config.reference_path.parent().unwrap())?;
    create_reference(
        &config.reference_path,
        &[
            ("SFO", "San Francisco", "CA"),
            ("DEN", "Denver", "CO"),
        ],
    )?;
    create_template(&config.template_path)
}

fn sample_inventory(path: &Path) -> anyhow::Result<()> {
    let mut cheap = inventory_row("SFO", "VIN4", "2020", "Honda", "Civic");
    cheap[19] = "$9,999".into();

    create_inventory(
        path,
        vec![
            inventory_row("SFO", "VIN1", "2022", "Toyota", "Camry"),
            inventory_row("DEN", "VIN2", "2021", "Ford", "F-150"),
            inventory_row("ZZZ", "VIN3", "2019", "Kia", "Soul"),
            inventory_row("SFO", "VIN1", "2022", "Toyota", "Camry"),
            vec![String::new(); 21],
            cheap,
        ],
    )
}

#[test]
fn test_generate_report() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    setup_assets(&config)?;

    let input = dir.path().join("inventory.xlsx");
    let output = dir.path().join("nationwide.xlsx");
    sample_inventory(&input)?;

    let pipeline = Pipeline::from_config(config.clone())?;
    let report = pipeline.generate(&input, &output)?;

    assert_eq!(report.report_date.as_deref(), Some("Inventory Report 2024-05-01"));
    assert_eq!(report.input_rows, 5);
    assert_eq!(report.written_rows, 3);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.blank, 1);
    assert_eq!(report.malformed, 0);
    assert_eq!(report.msrp_not_available, 1);
    assert_eq!(report.parse_warnings.total(), 0);

    // Cache and working copy were created
    assert!(config.cache_path.exists());
    assert!(config.template_copy_path.exists());

    let rows = read_sheet_rows(&output, Some("Sheet1"))?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0][6], "Drive");
    assert_eq!(rows[0][0], "State");

    let summary: Vec<_> = rows[1..]
        .iter()
        .map(|r| format!("{}|{}|{}|{}|{}", r[0], r[1], r[2], r[3], r[4]))
        .collect();
    assert_eq!(
        summary,
        vec![
            "CA|San Francisco|2020|Honda|Civic",
            "CA|San Francisco|2022|Toyota|Camry",
            "CO|Denver|2021|Ford|F-150",
        ]
    );

    // Honda row: implausible MSRP
    assert_eq!(rows[1][7], "VIN4");
    assert_eq!(rows[1][11], "n/a");
    // Toyota row: numeric fields parsed
    assert_eq!(rows[2][5], "LE");
    assert_eq!(rows[2][6], "AWD");
    assert_eq!(rows[2][8], "Silver");
    assert_eq!(rows[2][9], "12000");
    assert_eq!(rows[2][10], "45000");
    assert_eq!(rows[2][11], "52000");

    // Numeric cells are numbers, not text
    let mut workbook = open_workbook_auto(&output)?;
    let range = workbook.worksheet_range("Sheet1")?;
    assert_eq!(range.get_value((2, 2)), Some(&Data::Float(2022.0)));
    assert_eq!(range.get_value((2, 10)), Some(&Data::Float(45000.0)));
    assert_eq!(range.get_value((1, 11)), Some(&Data::String("n/a".to_string())));

    let ledger = fs::read_to_string(&config.ledger_path)?;
    assert_eq!(
        ledger,
        "Airport Code,Rental Desc,District Desc,Rental Zone Desc\n\
         ZZZ,Airport Rental,Bay District,West Zone\n"
    );
    Ok(())
}

#[test]
fn test_rerun_gives_same_report_and_appends_ledger() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    setup_assets(&config)?;

    let input = dir.path().join("inventory.xlsx");
    let first = dir.path().join("first.xlsx");
    let second = dir.path().join("second.xlsx");
    sample_inventory(&input)?;

    let pipeline = Pipeline::from_config(config.clone())?;
    let first_report = pipeline.generate(&input, &first)?;
    let after_first = fs::read_to_string(&config.ledger_path)?;

    // Second run loads the cached directory
    let pipeline = Pipeline::from_config(config.clone())?;
    let second_report = pipeline.generate(&input, &second)?;
    let after_second = fs::read_to_string(&config.ledger_path)?;

    assert_eq!(first_report.duplicates, 1);
    assert_eq!(second_report.duplicates, 1);
    assert_eq!(first_report.written_rows, second_report.written_rows);

    let first_rows = read_sheet_rows(&first, Some("Sheet1"))?;
    let second_rows = read_sheet_rows(&second, Some("Sheet1"))?;
    assert_eq!(first_rows.len(), 4);
    assert_eq!(first_rows, second_rows);
    assert_eq!(first_rows.iter().filter(|r| r[7] == "VIN1").count(), 1);

    assert!(after_second.starts_with(&after_first));
    assert_eq!(after_second.matches("Airport Code").count(), 1);
    assert_eq!(after_second.matches("ZZZ").count(), 2);
    Ok(())
}

#[test]
fn test_numeric_msrp_cell_is_kept() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    setup_assets(&config)?;

    // Written as a number cell, shown as $52,000
    let mut row = inventory_row("SFO", "VIN1", "2022", "Toyota", "Camry");
    row[19] = "52000".into();
    let input = dir.path().join("inventory.xlsx");
    let output = dir.path().join("nationwide.xlsx");
    create_inventory(&input, vec![row])?;

    let report = Pipeline::from_config(config)?.generate(&input, &output)?;
    assert_eq!(report.msrp_not_available, 0);

    let mut workbook = open_workbook_auto(&output)?;
    let range = workbook.worksheet_range("Sheet1")?;
    assert_eq!(range.get_value((1, 11)), Some(&Data::Float(52000.0)));
    Ok(())
}

#[test]
fn test_all_unresolved_writes_header_only() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    setup_assets(&config)?;

    let input = dir.path().join("inventory.xlsx");
    let output = dir.path().join("nationwide.xlsx");
    create_inventory(
        &input,
        vec![inventory_row("ZZZ", "VIN1", "2022", "Toyota", "Camry")],
    )?;

    let report = Pipeline::from_config(config)?.generate(&input, &output)?;
    assert_eq!(report.written_rows, 0);
    assert_eq!(report.unresolved, 1);

    let rows = read_sheet_rows(&output, Some("Sheet1"))?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][6], "Drive");
    Ok(())
}

#[test]
fn test_corrupt_cache_is_rebuilt() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    setup_assets(&config)?;
    fs::write(&config.cache_path, b"not a cache")?;

    let pipeline = Pipeline::from_config(config.clone())?;
    assert_eq!(pipeline.directory().len(), 2);

    let reloaded = LocationDirectory::load(&config.cache_path)?;
    assert_eq!(reloaded.lookup("DEN").map(|r| r.city.as_str()), Some("Denver"));
    Ok(())
}

#[test]
fn test_empty_reference_is_fatal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    setup_assets(&config)?;
    create_reference(&config.reference_path, &[])?;

    let err = match Pipeline::from_config(config.clone()) {
        Ok(_) => anyhow::bail!("expected a build error"),
        Err(e) => e,
    };
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::NoDataRows(_))
    ));
    assert!(!config.cache_path.exists());
    Ok(())
}

#[test]
fn test_missing_reference_is_fatal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());

    let err = match Pipeline::from_config(config) {
        Ok(_) => anyhow::bail!("expected a build error"),
        Err(e) => e,
    };
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::Read { .. })
    ));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = test_config(dir.path());
    setup_assets(&config)?;
    config.template_copy_path = config.template_path.clone();

    let err = match Pipeline::from_config(config.clone()) {
        Ok(_) => anyhow::bail!("expected a configuration error"),
        Err(e) => e,
    };
    assert_eq!(err.to_string(), "Invalid configuration");
    assert!(format!("{:#}", err).contains("template_copy_path"));
    // Rejected before the directory is built
    assert!(!config.cache_path.exists());
    Ok(())
}
