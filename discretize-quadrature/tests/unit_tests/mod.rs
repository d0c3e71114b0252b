mod simplex;
mod tensor;
mod univariate;
