/// Integration test target: server, storage and prediction pipeline
mod basic_integration;
mod prediction_flow;
mod test_doubles;
