pub mod gather;

/// Print the sample configuration with its description as a header.
pub fn sample_config() {
    println!("# {}", mesos_gather::DESCRIPTION);
    print!("{}", mesos_gather::SAMPLE_CONFIG);
}
