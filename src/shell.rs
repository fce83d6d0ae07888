//! Interactive menu
//!
//! A numbered menu over one in-memory index: import, save, load and the
//! four queries. Generic over its input and output so it can be driven by
//! stdin/stdout or by a test script.

use crate::import::CsvImporter;
use crate::index::EnergyIndex;
use crate::query::{Analyzer, Field};
use crate::storage::{snapshot, TimeRange, Timestamp};
use std::io::{BufRead, Write};
use std::path::PathBuf;

const MENU: &str = "\n--- MENU ---
1. Import CSV
2. Save snapshot
3. Load snapshot (clears current data)
4. Sum
5. Average
6. Search
7. Compare periods
0. Exit";

pub struct Shell<R, W> {
    input: R,
    output: W,
    index: EnergyIndex,
    data_file: PathBuf,
    importer: CsvImporter,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(input: R, output: W, data_file: PathBuf, importer: CsvImporter) -> Self {
        Self {
            input,
            output,
            index: EnergyIndex::new(),
            data_file,
            importer,
        }
    }

    /// Start from an existing index instead of an empty one
    pub fn with_index(mut self, index: EnergyIndex) -> Self {
        self.index = index;
        self
    }

    pub fn index(&self) -> &EnergyIndex {
        &self.index
    }

    /// Run the menu until `0` or end of input
    pub fn run(&mut self) -> std::io::Result<()> {
        loop {
            writeln!(self.output, "{}", MENU)?;
            let Some(choice) = self.prompt("Choice: ")? else {
                break;
            };

            match choice.as_str() {
                "1" => self.import()?,
                "2" => self.save()?,
                "3" => self.load()?,
                "4" => self.aggregate(false)?,
                "5" => self.aggregate(true)?,
                "6" => self.search()?,
                "7" => self.compare()?,
                "0" => {
                    writeln!(self.output, "Bye.")?;
                    break;
                }
                other => writeln!(self.output, "Unknown option: {}", other)?,
            }
        }

        self.output.flush()
    }

    /// Print a prompt and read one trimmed line; `None` at end of input
    fn prompt(&mut self, text: &str) -> std::io::Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt_time(&mut self, label: &str) -> std::io::Result<Option<Timestamp>> {
        let Some(text) = self.prompt(&format!("{} (YYYY-MM-DD [HH:MM]): ", label))? else {
            return Ok(None);
        };

        match text.parse::<Timestamp>() {
            Ok(ts) => Ok(Some(ts)),
            Err(e) => {
                writeln!(self.output, "{}", e)?;
                Ok(None)
            }
        }
    }

    fn prompt_range(&mut self, label: &str) -> std::io::Result<Option<TimeRange>> {
        let Some(start) = self.prompt_time(&format!("{} start", label))? else {
            return Ok(None);
        };
        let Some(end) = self.prompt_time(&format!("{} end", label))? else {
            return Ok(None);
        };
        Ok(Some(TimeRange::between(&start, &end)))
    }

    fn prompt_number(&mut self, label: &str) -> std::io::Result<Option<f64>> {
        let Some(text) = self.prompt(label)? else {
            return Ok(None);
        };

        match text.replace(',', ".").parse::<f64>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                writeln!(self.output, "Invalid number: {}", text)?;
                Ok(None)
            }
        }
    }

    /// Ask for a field code; an out-of-range code is reported and yields `None`
    fn prompt_field(&mut self) -> std::io::Result<Option<Field>> {
        let Some(text) = self.prompt(
            "Field (1-Auto, 2-Export, 3-Import, 4-Consumption, 5-Production): ",
        )?
        else {
            return Ok(None);
        };

        match text.parse::<i64>().map(Field::from_code) {
            Ok(Field::Zero) | Err(_) => {
                writeln!(self.output, "Invalid field.")?;
                Ok(None)
            }
            Ok(field) => Ok(Some(field)),
        }
    }

    fn import(&mut self) -> std::io::Result<()> {
        let Some(path) = self.prompt("CSV file: ")? else {
            return Ok(());
        };

        match self.importer.import(path.as_ref(), &mut self.index) {
            Ok(report) => {
                writeln!(
                    self.output,
                    "Imported: {}, Rejected: {}",
                    report.accepted, report.rejected
                )?;
                for error in report.errors.iter().take(10) {
                    writeln!(self.output, "  {}", error)?;
                }
            }
            Err(e) => writeln!(self.output, "Import failed: {}", e)?,
        }
        Ok(())
    }

    fn save(&mut self) -> std::io::Result<()> {
        match snapshot::save(&self.index, &self.data_file) {
            Ok(written) => writeln!(
                self.output,
                "Saved {} measurements to {}",
                written,
                self.data_file.display()
            ),
            Err(e) => writeln!(self.output, "Save failed: {}", e),
        }
    }

    fn load(&mut self) -> std::io::Result<()> {
        match snapshot::load(&mut self.index, &self.data_file) {
            Ok(summary) => writeln!(
                self.output,
                "Loaded {} measurements from {}",
                summary.loaded,
                self.data_file.display()
            ),
            Err(e) => writeln!(self.output, "Load failed: {}", e),
        }
    }

    fn aggregate(&mut self, average: bool) -> std::io::Result<()> {
        let Some(range) = self.prompt_range("Period")? else {
            return Ok(());
        };
        let Some(field) = self.prompt_field()? else {
            return Ok(());
        };

        let analyzer = Analyzer::new(&self.index);
        let result = if average {
            analyzer.average(range, field)
        } else {
            analyzer.sum(range, field)
        };

        writeln!(self.output, "Result: {:.2}", result)
    }

    fn search(&mut self) -> std::io::Result<()> {
        let Some(field) = self.prompt_field()? else {
            return Ok(());
        };
        let Some(target) = self.prompt_number("Target value: ")? else {
            return Ok(());
        };
        let Some(tolerance) = self.prompt_number("Tolerance: ")? else {
            return Ok(());
        };
        let Some(range) = self.prompt_range("Period")? else {
            return Ok(());
        };

        let mut lines = Vec::new();
        let hits = Analyzer::new(&self.index).search(field, target, tolerance, range, |hit| {
            lines.push(hit.to_string())
        });

        for line in lines {
            writeln!(self.output, "{}", line)?;
        }
        writeln!(self.output, "Matches: {}", hits)
    }

    fn compare(&mut self) -> std::io::Result<()> {
        let Some(first) = self.prompt_range("Period 1")? else {
            return Ok(());
        };
        let Some(second) = self.prompt_range("Period 2")? else {
            return Ok(());
        };
        let Some(field) = self.prompt_field()? else {
            return Ok(());
        };

        let comparison = Analyzer::new(&self.index).compare(first, second, field);
        writeln!(self.output, "{}", comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Measurement;
    use tempfile::tempdir;

    fn sample_index() -> EnergyIndex {
        [
            Measurement::at(Timestamp::new(2021, 2, 1, 0, 0, 0)).production(100.0).export(55.5),
            Measurement::at(Timestamp::new(2021, 2, 1, 0, 15, 0)).production(250.5),
        ]
        .into_iter()
        .collect()
    }

    fn run_script(script: &str, index: EnergyIndex, data_file: PathBuf) -> (String, usize) {
        let mut output = Vec::new();
        let len = {
            let mut shell = Shell::new(script.as_bytes(), &mut output, data_file, CsvImporter::new())
                .with_index(index);
            shell.run().unwrap();
            shell.index().len()
        };
        (String::from_utf8(output).unwrap(), len)
    }

    #[test]
    fn test_sum_and_average() {
        let script = "4\n2021-02-01 00:00\n2021-02-01 00:15\n5\n\
                      5\n2021-02-01 00:00\n2021-02-01 00:15\n5\n0\n";
        let (out, _) = run_script(script, sample_index(), PathBuf::from("unused.bin"));

        assert!(out.contains("Result: 350.50"));
        assert!(out.contains("Result: 175.25"));
        assert!(out.contains("Bye."));
    }

    #[test]
    fn test_invalid_field_skips_operation() {
        let script = "4\n2021-02-01\n2021-02-02\n9\n0\n";
        let (out, _) = run_script(script, sample_index(), PathBuf::from("unused.bin"));

        assert!(out.contains("Invalid field."));
        assert!(!out.contains("Result:"));
    }

    #[test]
    fn test_search_and_compare() {
        let script = "6\n2\n55.5\n0\n2021-02-01\n2021-02-02\n\
                      7\n2021-02-01 00:00\n2021-02-01 00:00\n2021-02-01 00:15\n2021-02-01 00:15\n5\n0\n";
        let (out, _) = run_script(script, sample_index(), PathBuf::from("unused.bin"));

        assert!(out.contains("Found 55.50 on 01.02"));
        assert!(out.contains("Matches: 1"));
        assert!(out.contains("Period 1 production: 100.00"));
        assert!(out.contains("Period 2 production: 250.50"));
        assert!(out.contains("Difference: -150.50"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let data_file = dir.path().join("energy.bin");

        let (out, _) = run_script("2\n0\n", sample_index(), data_file.clone());
        assert!(out.contains("Saved 2 measurements"));

        let (out, len) = run_script("3\n0\n", EnergyIndex::new(), data_file);
        assert!(out.contains("Loaded 2 measurements"));
        assert_eq!(len, 2);
    }

    #[test]
    fn test_failed_load_keeps_working_index() {
        let dir = tempdir().unwrap();
        let data_file = dir.path().join("energy.bin");
        std::fs::write(&data_file, b"not a snapshot file").unwrap();

        let (out, len) = run_script("3\n0\n", sample_index(), data_file);
        assert!(out.contains("Load failed"));
        assert_eq!(len, 2);
    }

    #[test]
    fn test_import_from_menu() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("export.csv");
        std::fs::write(
            &csv,
            "Time;Auto;Export;Import;Cons;Prod\n01.02.2021 00:00;1;2;3;4;5\nbroken\n",
        )
        .unwrap();

        let script = format!("1\n{}\n0\n", csv.display());
        let (out, len) = run_script(&script, EnergyIndex::new(), dir.path().join("energy.bin"));

        assert!(out.contains("Imported: 1, Rejected: 1"));
        assert_eq!(len, 1);
    }

    #[test]
    fn test_end_of_input_exits() {
        let (out, len) = run_script("", sample_index(), PathBuf::from("unused.bin"));
        assert!(out.contains("--- MENU ---"));
        assert_eq!(len, 2);
    }

    #[test]
    fn test_unknown_option() {
        let (out, _) = run_script("42\n0\n", EnergyIndex::new(), PathBuf::from("unused.bin"));
        assert!(out.contains("Unknown option: 42"));
    }
}
