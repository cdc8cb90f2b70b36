//! Schema command - print expected input and output formats

use super::report::ReportOutput;
use crate::input::CSV_COLUMNS;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema of `report --json`
    JsonSchema,
    /// CSV header row of the broker export
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema(),
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(ReportOutput);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) -> anyhow::Result<()> {
        println!("{}", CSV_COLUMNS.join(";"));
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("CSV Input Format");
        println!("================");
        println!();
        for (name, required, description) in CSV_FIELD_DESCRIPTIONS {
            let req = if *required { "required" } else { "optional" };
            println!("{:26} ({:8})  {}", name, req, description);
        }
        println!();
        println!("Types are matched case-insensitively. Ignored: 'Erträgnis ohne Wiederanlage',");
        println!("and any type containing 'Zugang', 'Merge' or 'Übertrag'.");
        println!("EUR prices are the local prices divided by Devisenkurs.");
        Ok(())
    }
}

const CSV_FIELD_DESCRIPTIONS: &[(&str, bool, &str)] = &[
    (
        "Transaktion",
        true,
        "Kauf, Erträgnis (open a lot); Verkauf, Entgeltbelastung (consume lots)",
    ),
    ("Buchungsdatum", true, "Booking date: dd.mm.yyyy or yyyy-mm-dd"),
    ("ISIN", true, "Fund identifier; all state is kept per ISIN"),
    ("Anteile", true, "Number of units, must not be negative"),
    ("Abrechnungspreis", true, "Settlement price in fund currency"),
    ("Rücknahmepreis", true, "Redemption price in fund currency, used for gains"),
    ("Fondswährung", true, "Fund currency code"),
    ("Devisenkurs", true, "Fund currency per EUR, must be positive"),
    ("Ausgabeaufschlag in EUR", false, "Issue surcharge, informational"),
    ("Abrechnungsbetrag in EUR", true, "Settlement amount, passed through"),
];
