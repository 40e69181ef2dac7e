// Resume optimization: prompt construction, model reply normalization, and
// the request pipeline that ties extraction and the model gateway together.
// All generation calls go through llm_client::ModelGateway.

pub mod handlers;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
