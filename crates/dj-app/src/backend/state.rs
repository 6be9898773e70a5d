use crate::generator::Generator;

pub struct GenState {
    pub generator: Generator,
}

impl GenState {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator
        }
    }
}
