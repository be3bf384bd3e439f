use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to execute `{command}`, error: {source}"))]
    Execute { command: String, source: std::io::Error },
}
