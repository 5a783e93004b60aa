use std::io::Write;

/// Line-delimited progress output: one line with the objective values of each discovered feasible point and a
/// separator line after each run.
pub struct ProgressLog {
    writer: Box<dyn Write>,
}

pub const SEPARATOR: &str = "--";

impl ProgressLog {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }

    pub fn point(&mut self, costs: &[f64]) -> std::io::Result<()> {
        let line: Vec<String> = costs.iter().map(|c| c.to_string()).collect();
        writeln!(self.writer, "{}", line.join(" "))
    }

    pub fn separator(&mut self) -> std::io::Result<()> {
        writeln!(self.writer, "{}", SEPARATOR)?;
        self.writer.flush()
    }
}
