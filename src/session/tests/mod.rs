// Scenario tests for the live session


#[cfg(test)]
mod test_connection;
