use crate::model::{Instance, ProjectId, Solution, StudentId};
use eyre::{Result, WrapErr};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

pub fn load_instance(path: &Path) -> Result<Instance> {
    let file = File::open(path).wrap_err_with(|| format!("cannot open {}", path.display()))?;
    let instance: Instance = serde_json::from_reader(BufReader::new(file))
        .wrap_err_with(|| format!("cannot parse instance {}", path.display()))?;
    debug!(
        students = instance.students.len(),
        projects = instance.projects.len(),
        languages = instance.languages.len(),
        "instance loaded"
    );
    Ok(instance)
}

pub fn save_instance(path: &Path, instance: &Instance) -> Result<()> {
    let file = File::create(path).wrap_err_with(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, instance).wrap_err("cannot write instance")?;
    writer.flush()?;
    Ok(())
}

/// Read a solution, as CSV if the file name ends in `.csv`, as JSON
/// otherwise.
pub fn load_solution(path: &Path) -> Result<Solution> {
    let file = File::open(path).wrap_err_with(|| format!("cannot open {}", path.display()))?;
    let reader = BufReader::new(file);
    if is_csv(path) {
        read_csv(reader).wrap_err_with(|| format!("cannot parse solution {}", path.display()))
    } else {
        serde_json::from_reader(reader)
            .wrap_err_with(|| format!("cannot parse solution {}", path.display()))
    }
}

pub fn save_solution(path: &Path, solution: &Solution) -> Result<()> {
    let file = File::create(path).wrap_err_with(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    if is_csv(path) {
        write_csv(&mut writer, solution)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, solution).wrap_err("cannot write solution")?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// One `project,student` row per assignment, sorted by project then student.
pub fn write_csv(writer: impl Write, solution: &Solution) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["project", "student"])?;
    for (student, project) in solution.sorted() {
        csv.serialize((project, student))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn read_csv(reader: impl Read) -> Result<Solution> {
    let mut csv = csv::Reader::from_reader(reader);
    let assignments = csv
        .deserialize::<(ProjectId, StudentId)>()
        .map(|row| row.map(|(project, student)| (student, project)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Solution::new(assignments))
}
