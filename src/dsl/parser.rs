use crate::domain::architecture::{Architecture, DIGIT_CLASSES};
use crate::domain::layer::{
    Activation, Conv2dSpec, DenseSpec, InputSpec, LayerSpec, Padding, PoolSpec,
};
use crate::domain::plan::{DatasetKind, LossKind, OptimizerKind, Program, TrainingPlan};
use crate::dsl::lexer::{Token, TokenKind};
use crate::dsl::DslError;

/// Input assumed when a description declares no `input(...)` layer
const DEFAULT_INPUT: InputSpec = InputSpec { height: 28, width: 28, channels: 1 };

/// Batch size the random-data fallback trains with
const RANDOM_BATCH_SIZE: usize = 16;

/// `key = value` as written inside a layer or train block
struct Param {
    key:    String,
    value:  TokenKind,
    line:   usize,
    column: usize,
}

impl Param {
    fn number(&self) -> Result<usize, DslError> {
        match self.value {
            TokenKind::Number(n) => usize::try_from(n)
                .map_err(|_| self.error(format!("'{}' value {n} is too large", self.key))),
            ref other => Err(self.error(format!(
                "'{}' expects a number, found {}",
                self.key,
                other.describe()
            ))),
        }
    }

    fn ident(&self) -> Result<&str, DslError> {
        match &self.value {
            TokenKind::Ident(s) => Ok(s),
            other => Err(self.error(format!(
                "'{}' expects a name, found {}",
                self.key,
                other.describe()
            ))),
        }
    }

    fn error(&self, message: String) -> DslError {
        DslError::new(message, self.line, self.column)
    }
}

pub struct Parser {
    tokens:   Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, position: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, DslError> {
        self.expect(TokenKind::Network, "a description must start with 'network'")?;
        let name = self.expect_ident("expected a network name after 'network'")?;
        self.expect(TokenKind::LBrace, "expected '{' after the network name")?;

        let mut layers = Vec::new();
        loop {
            let token = self.current().clone();
            let layer = match token.kind {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    return Err(self.error_here("unexpected end of input inside the network block"))
                }
                TokenKind::Input     => self.parse_input()?,
                TokenKind::Conv2d    => self.parse_conv2d()?,
                TokenKind::MaxPool2d => self.parse_maxpool2d()?,
                TokenKind::Flatten   => {
                    self.advance();
                    LayerSpec::Flatten
                }
                TokenKind::Dense  => self.parse_dense(64, Activation::Relu)?,
                TokenKind::Output => self.parse_dense(DIGIT_CLASSES, Activation::Softmax)?,
                other => {
                    return Err(self.error_here(&format!(
                        "expected a layer, found {}",
                        other.describe()
                    )))
                }
            };
            layers.push(layer);
        }

        if !matches!(layers.first(), Some(LayerSpec::Input(_))) {
            tracing::debug!("network '{name}' declares no input layer, assuming 28x28x1");
            layers.insert(0, LayerSpec::Input(DEFAULT_INPUT));
        }

        let plan = if self.check(&TokenKind::Train) {
            self.parse_train()?
        } else {
            plan_from(TrainSettings::default())
        };

        self.expect(TokenKind::Eof, "unexpected content after the description")?;

        Ok(Program { name, architecture: Architecture::new(layers), plan })
    }

    // input(channels, height, width), commas optional
    fn parse_input(&mut self) -> Result<LayerSpec, DslError> {
        self.advance();
        self.expect(TokenKind::LParen, "expected '(' after 'input'")?;
        let channels = self.expect_number("input needs 3 numbers: channels, height, width")?;
        self.accept(&TokenKind::Comma);
        let height = self.expect_number("input needs 3 numbers: channels, height, width")?;
        self.accept(&TokenKind::Comma);
        let width = self.expect_number("input needs 3 numbers: channels, height, width")?;
        self.expect(TokenKind::RParen, "expected ')' to close 'input'")?;
        Ok(LayerSpec::Input(InputSpec { height, width, channels }))
    }

    fn parse_conv2d(&mut self) -> Result<LayerSpec, DslError> {
        self.advance();
        let mut spec = Conv2dSpec {
            filters:    32,
            kernel:     3,
            activation: Activation::Relu,
            padding:    Padding::Same,
        };
        for param in self.parse_params()? {
            match param.key.as_str() {
                "filters"    => spec.filters = param.number()?,
                "kernel"     => spec.kernel = param.number()?,
                "activation" => spec.activation = activation(&param)?,
                "padding"    => {
                    let name = param.ident()?;
                    spec.padding = Padding::from_name(name)
                        .ok_or_else(|| param.error(format!("unknown padding '{name}'")))?;
                }
                _ => return Err(unknown_param("conv2d", &param)),
            }
        }
        Ok(LayerSpec::Conv2d(spec))
    }

    fn parse_maxpool2d(&mut self) -> Result<LayerSpec, DslError> {
        self.advance();
        let mut spec = PoolSpec { size: 2 };
        for param in self.parse_params()? {
            match param.key.as_str() {
                "size" => spec.size = param.number()?,
                _ => return Err(unknown_param("maxpool2d", &param)),
            }
        }
        Ok(LayerSpec::MaxPool2d(spec))
    }

    /// `dense` and `output` share syntax; only their defaults differ
    fn parse_dense(
        &mut self,
        default_units: usize,
        default_activation: Activation,
    ) -> Result<LayerSpec, DslError> {
        let keyword = if self.check(&TokenKind::Output) { "output" } else { "dense" };
        self.advance();
        let mut spec = DenseSpec { units: default_units, activation: default_activation };
        for param in self.parse_params()? {
            match param.key.as_str() {
                "units"      => spec.units = param.number()?,
                "activation" => spec.activation = activation(&param)?,
                _ => return Err(unknown_param(keyword, &param)),
            }
        }
        Ok(LayerSpec::Dense(spec))
    }

    /// Zero or more `key = value` pairs, each optionally followed by ','
    fn parse_params(&mut self) -> Result<Vec<Param>, DslError> {
        let mut params: Vec<Param> = Vec::new();
        while matches!(self.current().kind, TokenKind::Ident(_)) {
            let key_token = self.current().clone();
            let key = self.expect_ident("expected a parameter name")?;
            self.expect(TokenKind::Equals, &format!("expected '=' after '{key}'"))?;
            let value = self.parse_value()?;
            self.accept(&TokenKind::Comma);

            if params.iter().any(|p| p.key == key) {
                return Err(DslError::new(
                    format!("parameter '{key}' is given twice"),
                    key_token.line,
                    key_token.column,
                ));
            }
            params.push(Param { key, value, line: key_token.line, column: key_token.column });
        }
        Ok(params)
    }

    fn parse_value(&mut self) -> Result<TokenKind, DslError> {
        match self.current().kind.clone() {
            kind @ (TokenKind::Number(_) | TokenKind::Ident(_)) => {
                self.advance();
                Ok(kind)
            }
            other => Err(self.error_here(&format!(
                "expected a number or a name, found {}",
                other.describe()
            ))),
        }
    }

    // train { key (':' | '=') value ','? ... }
    fn parse_train(&mut self) -> Result<TrainingPlan, DslError> {
        self.advance();
        self.expect(TokenKind::LBrace, "expected '{' after 'train'")?;

        let mut settings = TrainSettings::default();
        loop {
            match self.current().kind.clone() {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Ident(_) => {}
                other => {
                    return Err(self.error_here(&format!(
                        "expected a training setting, found {}",
                        other.describe()
                    )))
                }
            }

            let key_token = self.current().clone();
            let key = self.expect_ident("expected a training setting")?;
            if !self.accept(&TokenKind::Colon) && !self.accept(&TokenKind::Equals) {
                return Err(self.error_here(&format!("expected ':' or '=' after '{key}'")));
            }
            let value = self.parse_value()?;
            self.accept(&TokenKind::Comma);
            let param = Param { key, value, line: key_token.line, column: key_token.column };

            match param.key.as_str() {
                "optimizer" => {
                    let name = param.ident()?;
                    settings.optimizer = OptimizerKind::from_name(name)
                        .ok_or_else(|| param.error(format!("unknown optimizer '{name}'")))?;
                }
                "loss" => {
                    let name = param.ident()?;
                    settings.loss = LossKind::from_name(name)
                        .ok_or_else(|| param.error(format!("unknown loss '{name}'")))?;
                }
                "epochs"     => settings.epochs = param.number()?,
                "batch_size" => settings.batch_size = Some(param.number()?),
                "dataset"    => {
                    let name = param.ident()?;
                    if !name.eq_ignore_ascii_case("mnist") {
                        return Err(param.error(format!("unknown dataset '{name}'")));
                    }
                    settings.dataset = DatasetKind::Mnist;
                }
                _ => return Err(unknown_param("train", &param)),
            }
        }

        Ok(plan_from(settings))
    }

    // ── token helpers ────────────────────────────────────────────────────────

    fn current(&self) -> &Token {
        // tokenize() always ends with Eof, and advance() never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn accept(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<(), DslError> {
        if self.accept(&kind) {
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String, DslError> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(message)),
        }
    }

    fn expect_number(&mut self, message: &str) -> Result<usize, DslError> {
        match self.current().kind {
            TokenKind::Number(n) => {
                let value = usize::try_from(n)
                    .map_err(|_| self.error_here(&format!("{message}: {n} is too large")))?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here(message)),
        }
    }

    fn error_here(&self, message: &str) -> DslError {
        let token = self.current();
        DslError::new(
            format!("{message} (found {})", token.kind.describe()),
            token.line,
            token.column,
        )
    }
}

/// Values collected from a `train { ... }` block before defaults apply
struct TrainSettings {
    optimizer:  OptimizerKind,
    loss:       LossKind,
    epochs:     usize,
    batch_size: Option<usize>,
    dataset:    DatasetKind,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            optimizer:  OptimizerKind::Adam,
            loss:       LossKind::CategoricalCrossentropy,
            epochs:     1,
            batch_size: None,
            dataset:    DatasetKind::Random,
        }
    }
}

fn plan_from(settings: TrainSettings) -> TrainingPlan {
    // Random data trains on all 100 samples in small batches
    let (default_batch, validation_fraction) = match settings.dataset {
        DatasetKind::Mnist  => (64, 0.1),
        DatasetKind::Random => (RANDOM_BATCH_SIZE, 0.0),
    };
    TrainingPlan {
        optimizer: settings.optimizer,
        loss: settings.loss,
        epochs: settings.epochs,
        batch_size: settings.batch_size.unwrap_or(default_batch),
        validation_fraction,
        learning_rate: None,
        dataset: settings.dataset,
    }
}

fn activation(param: &Param) -> Result<Activation, DslError> {
    let name = param.ident()?;
    Activation::from_name(name).ok_or_else(|| param.error(format!("unknown activation '{name}'")))
}

fn unknown_param(block: &str, param: &Param) -> DslError {
    param.error(format!("'{block}' has no parameter '{}'", param.key))
}
